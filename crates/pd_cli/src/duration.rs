use std::str::FromStr;
use std::time::Duration;

/// Duration written as `1h30m`, `45s`, `2d` or a bare number of seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HumanDuration(pub Duration);

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut total_seconds = 0u64;
        let mut current_number = String::new();
        let mut has_value = false;

        for c in s.chars() {
            if c.is_ascii_digit() {
                current_number.push(c);
            } else if c.is_whitespace() {
                continue;
            } else {
                let num = current_number
                    .parse::<u64>()
                    .map_err(|_| format!("Missing number before unit: {}", c))?;
                total_seconds += match c {
                    's' => num,
                    'm' => num * 60,
                    'h' => num * 3600,
                    'd' => num * 86400,
                    _ => return Err(format!("Invalid duration unit: {}", c)),
                };
                current_number.clear();
                has_value = true;
            }
        }

        if !current_number.is_empty() {
            total_seconds += current_number
                .parse::<u64>()
                .map_err(|_| "Invalid number in duration".to_string())?;
            has_value = true;
        }

        if !has_value {
            return Err("Duration must include a number".to_string());
        }

        Ok(HumanDuration(Duration::from_secs(total_seconds)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: &str) -> u64 {
        s.parse::<HumanDuration>().unwrap().0.as_secs()
    }

    #[test]
    fn test_units() {
        assert_eq!(secs("45s"), 45);
        assert_eq!(secs("1h30m"), 5400);
        assert_eq!(secs("1d"), 86400);
        assert_eq!(secs("1h 15m 30s"), 4530);
        assert_eq!(secs("90"), 90);
    }

    #[test]
    fn test_invalid() {
        assert!("".parse::<HumanDuration>().is_err());
        assert!("h".parse::<HumanDuration>().is_err());
        assert!("10w".parse::<HumanDuration>().is_err());
    }
}
