use rand::rngs::StdRng;

use super::{Detector, DetectorCategory};
use crate::bucket::quote;
use crate::engine::OpResult;
use crate::materializer::{DefaultGetter, Getter};

const PASSWD_MARKER: &str = "root:x:0:0:root:";

/// Fills inputs that tend to end up in shell commands with a passwd read.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsCommandInjectionGetter;

impl Getter for OsCommandInjectionGetter {
    fn string_value(&self, input_name: &str, rng: &mut StdRng) -> String {
        let value = match input_name.to_lowercase().as_str() {
            "host" => "localhost",
            "port" => "80",
            "path" => "/ ; cat /etc/passwd",
            "scheme" => "http",
            "cmd" => "cat /etc/passwd",
            _ => return DefaultGetter.string_value(input_name, rng),
        };
        quote(value)
    }
}

#[derive(Debug, Default)]
pub struct OsCommandInjectionDetector {
    getter: OsCommandInjectionGetter,
}

impl Detector for OsCommandInjectionDetector {
    fn name(&self) -> &'static str {
        "OS Command Injection"
    }

    fn category(&self) -> DetectorCategory {
        DetectorCategory::Injection
    }

    fn getter(&self) -> &dyn Getter {
        &self.getter
    }

    fn evaluate(&self, _payload: &str, result: &OpResult) -> (bool, bool) {
        let confirmed = result
            .data()
            .is_some_and(|data| data.to_string().contains(PASSWD_MARKER));
        (confirmed, confirmed)
    }
}
