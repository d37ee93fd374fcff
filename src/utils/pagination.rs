use serde::Deserialize;

const MIN_LIMIT: i64 = 3;
const MAX_LIMIT: i64 = 30;
const DEFAULT_LIMIT: i64 = 9;

/// Query-string pagination params. Out-of-range values are clamped rather
/// than rejected.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pagination {
    page: Option<i64>,
    limit: Option<i64>,
}

impl Pagination {
    pub fn page(&self) -> i64 {
        match self.page {
            Some(page) if page >= 1 => page,
            _ => 1,
        }
    }

    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_LIMIT)
            .clamp(MIN_LIMIT, MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.limit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pagination(page: Option<i64>, limit: Option<i64>) -> Pagination {
        Pagination { page, limit }
    }

    #[test]
    fn defaults_apply_when_params_missing() {
        let p = pagination(None, None);
        assert_eq!(p.page(), 1);
        assert_eq!(p.limit(), DEFAULT_LIMIT);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn limit_is_clamped_to_bounds() {
        assert_eq!(pagination(None, Some(1)).limit(), MIN_LIMIT);
        assert_eq!(pagination(None, Some(100)).limit(), MAX_LIMIT);
        assert_eq!(pagination(None, Some(15)).limit(), 15);
    }

    #[test]
    fn invalid_page_falls_back_to_first() {
        assert_eq!(pagination(Some(0), None).page(), 1);
        assert_eq!(pagination(Some(-3), None).page(), 1);
    }

    #[test]
    fn offset_follows_page_and_limit() {
        let p = pagination(Some(3), Some(10));
        assert_eq!(p.offset(), 20);
    }
}
