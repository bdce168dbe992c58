use chrono::NaiveDate;
use serde::Deserialize;

/// Outer envelope used by the scoring server. The payload is itself a JSON
/// document, encoded as a string in `message`.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub message: String,
}

/// The client's investment brief, fetched once per run.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientBrief {
    /// First day of the evaluation window.
    pub start: NaiveDate,
    /// Last day of the evaluation window. Also picks the ticker universe.
    pub end: NaiveDate,
    pub age: u32,
    pub employed: bool,
    pub salary: f64,
    /// Hard cap on the total cost of the submitted portfolio.
    pub budget: f64,
    /// Sector names the client refuses to hold.
    #[serde(default)]
    pub dislikes: Vec<String>,
}

/// Evaluation window carried through the screen and sizing stages.
#[derive(Debug, Clone, Copy)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ClientBrief {
    pub fn range(&self) -> DateRange {
        DateRange {
            start: self.start,
            end: self.end,
        }
    }
}

/// Decode the double-encoded brief out of a raw `/request` response body.
pub fn parse_brief(body: &str) -> Result<ClientBrief, serde_json::Error> {
    let envelope: Envelope = serde_json::from_str(body)?;
    serde_json::from_str(&envelope.message)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Extra fields such as `timestamp` ride along in real responses.
    const BODY: &str = r#"{"message": "{\"start\": \"2014-06-06\", \"end\": \"2014-08-09\", \"age\": 27, \"employed\": true, \"salary\": 28036, \"budget\": 8483, \"dislikes\": [\"Consumer Defensive\", \"Energy\"], \"timestamp\": \"2025-04-12 18:03:11\"}"}"#;

    #[test]
    fn decodes_the_nested_payload() {
        let brief = parse_brief(BODY).unwrap();
        assert_eq!(brief.start, NaiveDate::from_ymd_opt(2014, 6, 6).unwrap());
        assert_eq!(brief.end, NaiveDate::from_ymd_opt(2014, 8, 9).unwrap());
        assert_eq!(brief.age, 27);
        assert!(brief.employed);
        assert_eq!(brief.salary, 28036.0);
        assert_eq!(brief.budget, 8483.0);
        assert_eq!(brief.dislikes, vec!["Consumer Defensive", "Energy"]);
    }

    #[test]
    fn missing_dislikes_defaults_to_empty() {
        let body = r#"{"message": "{\"start\": \"2020-01-02\", \"end\": \"2020-03-02\", \"age\": 44, \"employed\": false, \"salary\": 0, \"budget\": 1200}"}"#;
        let brief = parse_brief(body).unwrap();
        assert!(brief.dislikes.is_empty());
    }

    #[test]
    fn garbage_inner_payload_is_an_error() {
        let body = r#"{"message": "You have a new client! Good luck."}"#;
        assert!(parse_brief(body).is_err());
    }

    #[test]
    fn garbage_outer_payload_is_an_error() {
        assert!(parse_brief("<html>502 Bad Gateway</html>").is_err());
    }
}
