use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct Pagination {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_page() -> u32 {
    1
}
fn default_per_page() -> u32 {
    50
}

const MAX_PER_PAGE: u32 = 500;

impl Pagination {
    pub fn limit(&self) -> u32 {
        self.per_page.clamp(1, MAX_PER_PAGE)
    }

    pub fn offset(&self) -> u32 {
        (self.page.max(1) - 1).saturating_mul(self.limit())
    }
}

#[derive(Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub total_pages: usize,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, pagination: &Pagination, total: usize) -> Self {
        let per_page = pagination.limit() as usize;

        PaginatedResponse {
            data,
            page: pagination.page.max(1) as usize,
            per_page,
            total,
            total_pages: total.div_ceil(per_page),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_compute_offset_and_pages() {
        let pagination = Pagination {
            page: 3,
            per_page: 20,
        };
        assert_eq!(pagination.offset(), 40);

        let response = PaginatedResponse::new(vec![1, 2], &pagination, 42);
        assert_eq!(response.total_pages, 3);
        assert_eq!(response.page, 3);
    }

    #[test]
    fn should_clamp_degenerate_values() {
        let pagination = Pagination {
            page: 0,
            per_page: 0,
        };
        assert_eq!(pagination.offset(), 0);
        assert_eq!(pagination.limit(), 1);

        let empty = PaginatedResponse::<u8>::new(vec![], &pagination, 0);
        assert_eq!(empty.total_pages, 0);
    }
}
