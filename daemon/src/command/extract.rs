use regex::Regex;

/// Result of scanning a transcript for the wake phrase and an intensity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extraction {
    /// Wake phrase absent.
    NoWake,
    /// Wake phrase present but no usable number after it.
    WakeNoIntensity,
    /// Wake phrase plus intensity, unclamped.
    Command(u32),
}

/// Finds the wake phrase anywhere in the transcript and parses the first
/// intensity anywhere in it; "30 lightning bolt" is as valid as
/// "lightning bolt 30".
///
/// Digits win over number words: "lightning bolt 75" parses as 75 even if
/// word numbers also appear. Word numbers are summed left to right within a
/// run ("twenty five" is 25, "five zero" is 5), "hundred" multiplies the
/// group so far, and "and" may join words of one run. The first run that
/// contains at least one number word wins.
pub struct CommandExtractor {
    wake_phrase: String,
    digits: Regex,
}

impl CommandExtractor {
    pub fn new(wake_phrase: &str) -> Self {
        Self {
            wake_phrase: wake_phrase.trim().to_lowercase(),
            // Post-processing guarantees lowercase input; 1-3 digits keeps
            // timestamps and long numerals from parsing as intensities.
            digits: Regex::new(r"\b(\d{1,3})\b").unwrap_or_else(|_| unreachable!()),
        }
    }

    pub fn wake_phrase(&self) -> &str {
        &self.wake_phrase
    }

    /// Expects post-processed (lowercased, whitespace-collapsed) text.
    pub fn extract(&self, text: &str) -> Extraction {
        if !text.contains(&self.wake_phrase) {
            return Extraction::NoWake;
        }

        if let Some(caps) = self.digits.captures(text) {
            if let Some(value) = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok()) {
                return Extraction::Command(value);
            }
        }

        match first_word_number(text) {
            Some(value) => Extraction::Command(value),
            None => Extraction::WakeNoIntensity,
        }
    }
}

fn word_value(word: &str) -> Option<u32> {
    let value = match word {
        "zero" => 0,
        "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        "eleven" => 11,
        "twelve" => 12,
        "thirteen" => 13,
        "fourteen" => 14,
        "fifteen" => 15,
        "sixteen" => 16,
        "seventeen" => 17,
        "eighteen" => 18,
        "nineteen" => 19,
        "twenty" => 20,
        "thirty" => 30,
        "forty" => 40,
        "fifty" => 50,
        "sixty" => 60,
        "seventy" => 70,
        "eighty" => 80,
        "ninety" => 90,
        _ => return None,
    };
    Some(value)
}

/// Resolves the first run of number words in `text`.
///
/// A run is a maximal sequence of number words, "hundred" and "and" tokens.
/// "and" alone never starts a run; "hundred" counts as a number word, so a
/// bare "hundred" resolves to 100.
fn first_word_number(text: &str) -> Option<u32> {
    let mut total: u32 = 0;
    let mut in_run = false;
    let mut saw_number = false;

    for raw in text.split_whitespace() {
        let word = raw.trim_matches(|c: char| !c.is_ascii_alphanumeric());
        if let Some(value) = word_value(word) {
            total = total.saturating_add(value);
            in_run = true;
            saw_number = true;
        } else if word == "hundred" {
            total = total.max(1).saturating_mul(100);
            in_run = true;
            saw_number = true;
        } else if word == "and" && in_run {
            // Connector, keeps the run alive.
        } else if in_run {
            if saw_number {
                return Some(total);
            }
            total = 0;
            in_run = false;
            saw_number = false;
        }
    }

    saw_number.then_some(total)
}
