//! Rounding applied when results leave the engine.
//!
//! Every computation runs at full precision; these helpers are only used by
//! `Serialize` impls and report formatting.

use serde::Serializer;

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

pub fn serialize_1dp<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_f64(round_to(*value, 1))
}

pub fn serialize_2dp<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_f64(round_to(*value, 2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_to(82.25, 1), 82.3);
        assert_eq!(round_to(-3.456, 2), -3.46);
        assert_eq!(round_to(6.136_31, 2), 6.14);
    }

    #[test]
    fn serializers_round_only_the_output() {
        #[derive(serde::Serialize)]
        struct Payload {
            #[serde(serialize_with = "serialize_1dp")]
            one: f64,
            #[serde(serialize_with = "serialize_2dp")]
            two: f64,
        }

        let payload = Payload {
            one: 82.222_222,
            two: 37.654_321,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["one"], serde_json::json!(82.2));
        assert_eq!(json["two"], serde_json::json!(37.65));
        assert_eq!(payload.one, 82.222_222);
    }
}
