pub mod moderators;
pub mod permissions;

/// Listing commands take a zero-based page; negative pages read as the first
/// page instead of producing a negative OFFSET the database would reject.
pub(crate) fn page_offset(page: i64, page_size: i64) -> i64 {
    page.max(0) * page_size
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_pages_clamp_to_the_first_page() {
        assert_eq!(page_offset(-3, 20), 0);
        assert_eq!(page_offset(0, 20), 0);
        assert_eq!(page_offset(2, 20), 40);
    }
}
