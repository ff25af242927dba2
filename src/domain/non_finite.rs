//! `serde(with = ...)` adapter for `f64` fields that may hold `inf` or `NaN`.
//!
//! JSON has no non-finite numbers (`serde_json` writes them as `null` and then
//! refuses to read them back), so they are written as the strings `"inf"`,
//! `"-inf"` and `"nan"`. Finite values stay plain numbers.

use serde::{Deserialize, Deserializer, Serializer, de};

pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_f64(*value)
    } else if value.is_nan() {
        serializer.serialize_str("nan")
    } else if *value > 0.0 {
        serializer.serialize_str("inf")
    } else {
        serializer.serialize_str("-inf")
    }
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Number(v) => Ok(v),
        Repr::Text(text) => match text.as_str() {
            "inf" => Ok(f64::INFINITY),
            "-inf" => Ok(f64::NEG_INFINITY),
            "nan" => Ok(f64::NAN),
            other => Err(de::Error::custom(format!("expected a number, `inf`, `-inf` or `nan`, got `{other}`"))),
        },
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct Wrapper {
        #[serde(with = "super")]
        value: f64,
    }

    fn round_trip(value: f64) -> f64 {
        let json = serde_json::to_string(&Wrapper { value }).unwrap();
        serde_json::from_str::<Wrapper>(&json).unwrap().value
    }

    #[test]
    fn non_finite_values_survive_json() {
        assert_eq!(round_trip(f64::INFINITY), f64::INFINITY);
        assert_eq!(round_trip(f64::NEG_INFINITY), f64::NEG_INFINITY);
        assert!(round_trip(f64::NAN).is_nan());
        assert_eq!(round_trip(0.25), 0.25);
    }

    #[test]
    fn finite_values_stay_numbers() {
        let json = serde_json::to_value(Wrapper { value: 1.5 }).unwrap();
        assert_eq!(json["value"], 1.5);
        let json = serde_json::to_value(Wrapper { value: f64::INFINITY }).unwrap();
        assert_eq!(json["value"], "inf");
        assert!(serde_json::from_str::<Wrapper>(r#"{"value":"big"}"#).is_err());
    }
}
