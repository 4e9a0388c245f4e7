use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

const EQ_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Operator {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    Ne,
}

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Eq => "==",
            Operator::Ne => "!=",
        }
    }

    pub fn evaluate(&self, value: f64, threshold: f64) -> bool {
        match self {
            Operator::Gt => value > threshold,
            Operator::Gte => value >= threshold,
            Operator::Lt => value < threshold,
            Operator::Lte => value <= threshold,
            Operator::Eq => (value - threshold).abs() < EQ_TOLERANCE,
            Operator::Ne => (value - threshold).abs() >= EQ_TOLERANCE,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Operator {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            ">" | "gt" => Ok(Operator::Gt),
            ">=" | "gte" => Ok(Operator::Gte),
            "<" | "lt" => Ok(Operator::Lt),
            "<=" | "lte" => Ok(Operator::Lte),
            "==" | "eq" => Ok(Operator::Eq),
            "!=" | "ne" => Ok(Operator::Ne),
            other => Err(ParseError {
                field: "operator",
                value: other.to_string(),
            }),
        }
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        op.symbol().to_string()
    }
}

impl TryFrom<String> for Operator {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbolic_and_word_forms_are_equivalent() {
        let pairs = [
            (">", "gt"),
            (">=", "gte"),
            ("<", "lt"),
            ("<=", "lte"),
            ("==", "eq"),
            ("!=", "ne"),
        ];
        for (sym, word) in pairs {
            assert_eq!(sym.parse::<Operator>(), word.parse::<Operator>());
        }
        assert!("~=".parse::<Operator>().is_err());
    }

    #[test]
    fn boundaries() {
        assert!(!Operator::Gt.evaluate(80.0, 80.0));
        assert!(Operator::Gte.evaluate(80.0, 80.0));
        assert!(Operator::Lt.evaluate(79.99, 80.0));
        assert!(!Operator::Lte.evaluate(80.01, 80.0));
        assert!(Operator::Eq.evaluate(0.1 + 0.2, 0.3));
        assert!(Operator::Ne.evaluate(1.0, 2.0));
    }

    #[test]
    fn serializes_as_symbol() {
        let json = serde_json::to_string(&Operator::Gte).expect("serialize");
        assert_eq!(json, "\">=\"");
        let parsed: Operator = serde_json::from_str("\"lt\"").expect("deserialize");
        assert_eq!(parsed, Operator::Lt);
    }
}
