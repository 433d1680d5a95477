use serde::Deserialize;

/// Query string of `GET /dump`.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct DumpQuery {
    pub wait: Option<String>,
    pub ttl: Option<u64>,
}

impl DumpQuery {
    pub fn wants_wait(&self) -> bool {
        self.wait
            .as_deref()
            .is_some_and(|wait| wait.eq_ignore_ascii_case("true") || wait == "1")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(wait: Option<&str>) -> DumpQuery {
        DumpQuery {
            wait: wait.map(str::to_string),
            ttl: None,
        }
    }

    #[test]
    fn only_truthy_values_wait() {
        assert!(query(Some("true")).wants_wait());
        assert!(query(Some("TRUE")).wants_wait());
        assert!(query(Some("1")).wants_wait());
        assert!(!query(Some("false")).wants_wait());
        assert!(!query(Some("")).wants_wait());
        assert!(!query(None).wants_wait());
    }
}
