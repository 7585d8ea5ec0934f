//! 列表分页

use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait, Select};
use serde::{Deserialize, Serialize};

use crate::api::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::errors::Result;

/// 规范化后的分页参数：page ≥ 1，page_size ∈ 1..=100
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub page_size: u64,
}

impl Pagination {
    pub fn new(page: Option<u64>, page_size: Option<u64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            page_size: page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub page_size: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            total: self.total,
            total_pages: self.total_pages,
        }
    }
}

pub async fn fetch_page<E>(
    select: Select<E>,
    db: &DatabaseConnection,
    pagination: Pagination,
) -> Result<Page<E::Model>>
where
    E: EntityTrait,
    E::Model: Send + Sync,
{
    let paginator = select.paginate(db, pagination.page_size);
    let total = paginator.num_items().await?;
    let items = paginator.fetch_page(pagination.page - 1).await?;

    Ok(Page {
        items,
        page: pagination.page,
        page_size: pagination.page_size,
        total,
        total_pages: total.div_ceil(pagination.page_size),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults_and_bounds() {
        assert_eq!(
            Pagination::new(None, None),
            Pagination {
                page: 1,
                page_size: 20
            }
        );
        assert_eq!(Pagination::new(Some(0), Some(0)).page, 1);
        assert_eq!(Pagination::new(Some(0), Some(0)).page_size, 1);
        assert_eq!(Pagination::new(Some(3), Some(500)).page_size, 100);
    }
}
