//! Offset cursors shared by the list endpoints.
//!
//! A cursor is the decimal offset of the next row. Handlers fetch one row
//! more than the limit to learn whether a further page exists.

use super::ApiError;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: i64,
    pub limit: i64,
}

impl Page {
    pub fn from_params(limit: Option<i64>, cursor: Option<&str>) -> Result<Self, ApiError> {
        Ok(Self {
            offset: parse_cursor(cursor)?,
            limit: limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        })
    }

    /// Rows to request: one past the limit.
    pub fn fetch(&self) -> i64 {
        self.limit + 1
    }

    /// Drop the look-ahead row and return the cursor for the next page.
    pub fn finish<T>(&self, rows: &mut Vec<T>) -> Option<String> {
        if rows.len() as i64 > self.limit {
            rows.truncate(self.limit as usize);
            Some((self.offset + self.limit).to_string())
        } else {
            None
        }
    }
}

fn parse_cursor(cursor: Option<&str>) -> Result<i64, ApiError> {
    match cursor.map(str::trim).filter(|c| !c.is_empty()) {
        None => Ok(0),
        Some(c) => c
            .parse::<i64>()
            .ok()
            .filter(|offset| *offset >= 0)
            .ok_or_else(|| ApiError::bad_request("Invalid cursor")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_is_clamped() {
        let limit = |l| Page::from_params(l, None).unwrap().limit;
        assert_eq!(limit(None), 50);
        assert_eq!(limit(Some(0)), 1);
        assert_eq!(limit(Some(-5)), 1);
        assert_eq!(limit(Some(75)), 75);
        assert_eq!(limit(Some(10_000)), 200);
    }

    #[test]
    fn test_cursor_parsing() {
        let offset = |c| Page::from_params(None, c).map(|p| p.offset);
        assert_eq!(offset(None).unwrap(), 0);
        assert_eq!(offset(Some(" ")).unwrap(), 0);
        assert_eq!(offset(Some("100")).unwrap(), 100);
        assert!(offset(Some("-1")).is_err());
        assert!(offset(Some("abc")).is_err());
    }

    #[test]
    fn test_finish_trims_look_ahead_row() {
        let page = Page::from_params(Some(2), Some("4")).unwrap();
        assert_eq!(page.fetch(), 3);

        let mut full = vec![1, 2, 3];
        assert_eq!(page.finish(&mut full), Some("6".to_string()));
        assert_eq!(full, vec![1, 2]);

        let mut last = vec![1, 2];
        assert_eq!(page.finish(&mut last), None);
        assert_eq!(last, vec![1, 2]);
    }
}
