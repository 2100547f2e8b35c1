use chrono::{Duration, SecondsFormat, Utc};
use rand::distributions::{Alphanumeric, Uniform};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::bucket::{quote, ObjectsBucket};
use crate::schema::EnumValue;

const UPPERCASE_DIGITS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

fn random_token(rng: &mut StdRng, len: usize) -> String {
    let dist = Uniform::from(0..UPPERCASE_DIGITS.len());
    (0..len).map(|_| UPPERCASE_DIGITS[rng.sample(dist)] as char).collect()
}

/// Produces literal values for scalar and enum inputs.
///
/// Every method has a benign default. Detector getters implement this trait and
/// override only the positions they want to attack, e.g. returning an
/// injection string from [`Getter::string_value`] for `search` inputs.
/// Returned strings are GraphQL literals, so string values carry quotes.
pub trait Getter: Send + Sync {
    fn string_value(&self, input_name: &str, rng: &mut StdRng) -> String {
        if input_name.to_lowercase().contains("email") {
            let user: String = (0..8).map(|_| char::from(rng.sample(Alphanumeric))).collect();
            return quote(&format!("{}@example.com", user.to_lowercase()));
        }
        quote(&random_token(rng, 10))
    }

    fn int_value(&self, _input_name: &str, rng: &mut StdRng) -> String {
        rng.gen_range(0..=100).to_string()
    }

    fn float_value(&self, input_name: &str, rng: &mut StdRng) -> String {
        let lower = input_name.to_lowercase();
        let value: f64 = if lower.contains("lat") || lower.contains("long") || lower.contains("lng") {
            rng.gen_range(-180.0..180.0)
        } else {
            rng.gen_range(0.0..1000.0)
        };
        format!("{value:.4}")
    }

    fn boolean_value(&self, _input_name: &str, rng: &mut StdRng) -> String {
        rng.gen_bool(0.5).to_string()
    }

    /// Prefers identifiers the target has already returned.
    fn id_value(&self, input_name: &str, bucket: &ObjectsBucket, rng: &mut StdRng) -> String {
        let known = bucket
            .get_random_scalar(input_name, rng)
            .or_else(|| bucket.get_random_scalar_where(|field| field.to_lowercase().ends_with("id"), rng));
        match known {
            Some(value) => quote(&value.raw),
            None => quote(&random_token(rng, 10)),
        }
    }

    fn date_value(&self, _input_name: &str, rng: &mut StdRng) -> String {
        let offset = Duration::days(rng.gen_range(-30..=30));
        quote(&(Utc::now() + offset).format("%Y-%m-%d").to_string())
    }

    fn datetime_value(&self, _input_name: &str, rng: &mut StdRng) -> String {
        let offset = Duration::seconds(rng.gen_range(-3 * 86_400..=3 * 86_400));
        quote(&(Utc::now() + offset).to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    fn time_value(&self, _input_name: &str, rng: &mut StdRng) -> String {
        quote(&format!(
            "{:02}:{:02}:{:02}",
            rng.gen_range(0..24),
            rng.gen_range(0..60),
            rng.gen_range(0..60)
        ))
    }

    fn long_value(&self, _input_name: &str, rng: &mut StdRng) -> String {
        rng.gen_range(0..=1_000_000u64).to_string()
    }

    fn json_value(&self, _input_name: &str, _rng: &mut StdRng) -> String {
        quote("{}")
    }

    /// Pagination cursors: null for forward cursors, a first page otherwise.
    fn cursor_value(&self, input_name: &str, _rng: &mut StdRng) -> String {
        match input_name {
            "after" | "from" => "null".to_string(),
            _ => "1".to_string(),
        }
    }

    fn custom_scalar_value(
        &self,
        input_name: &str,
        scalar_type: &str,
        bucket: &ObjectsBucket,
        rng: &mut StdRng,
    ) -> String {
        let lower = scalar_type.to_lowercase();
        if lower.contains("datetime") || lower.contains("timestamp") {
            self.datetime_value(input_name, rng)
        } else if lower.contains("date") {
            self.date_value(input_name, rng)
        } else if lower.contains("time") {
            self.time_value(input_name, rng)
        } else if lower.contains("cursor") {
            self.cursor_value(input_name, rng)
        } else if lower.contains("long") || lower.contains("bigint") {
            self.long_value(input_name, rng)
        } else if lower.contains("json") {
            self.json_value(input_name, rng)
        } else if lower.ends_with("id") || lower.ends_with("ids") {
            self.id_value(input_name, bucket, rng)
        } else {
            self.string_value(input_name, rng)
        }
    }

    fn scalar_value(&self, input_name: &str, scalar_type: &str, bucket: &ObjectsBucket, rng: &mut StdRng) -> String {
        match scalar_type {
            "String" => self.string_value(input_name, rng),
            "Int" => self.int_value(input_name, rng),
            "Float" => self.float_value(input_name, rng),
            "Boolean" => self.boolean_value(input_name, rng),
            "ID" => self.id_value(input_name, bucket, rng),
            other => self.custom_scalar_value(input_name, other, bucket, rng),
        }
    }

    /// A random non-deprecated value, or any value if all are deprecated.
    fn enum_value(&self, _input_name: &str, values: &[EnumValue], rng: &mut StdRng) -> Option<String> {
        let active: Vec<&EnumValue> = values.iter().filter(|v| !v.is_deprecated).collect();
        let chosen = if active.is_empty() {
            values.choose(rng)
        } else {
            active.choose(rng).copied()
        };
        chosen.map(|v| v.name.clone())
    }
}

/// Benign values for the positive traversal path.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultGetter;

impl Getter for DefaultGetter {}
