// src/pipeline/derive.rs

//! Pure filter → sort → page derivation.

use serde::Serialize;

use crate::models::Record;

/// Sort direction of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn toggled(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

/// Active sort column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec<F> {
    pub field: F,
    pub direction: Direction,
}

impl<F> SortSpec<F> {
    pub fn asc(field: F) -> Self {
        Self {
            field,
            direction: Direction::Asc,
        }
    }
}

/// Keep records where any of `fields` contains `term`, ignoring case.
///
/// The term is matched as typed, surrounding whitespace included. An empty
/// term keeps every record in its original order.
pub fn filter<'a, R, I>(records: I, fields: &[R::Field], term: &str) -> Vec<&'a R>
where
    R: Record + 'a,
    I: IntoIterator<Item = &'a R>,
{
    if term.is_empty() {
        return records.into_iter().collect();
    }
    let needle = term.to_lowercase();
    records
        .into_iter()
        .filter(|r| fields.iter().any(|f| r.value(*f).contains_folded(&needle)))
        .collect()
}

/// Keep records whose `field` equals `value`, ignoring case.
pub fn facet<'a, R, I>(records: I, field: R::Field, value: &str) -> Vec<&'a R>
where
    R: Record + 'a,
    I: IntoIterator<Item = &'a R>,
{
    records
        .into_iter()
        .filter(|r| r.value(field).equals_folded(value))
        .collect()
}

/// Stable sort by one column. Equal values keep their relative order.
pub fn sort<R: Record>(records: &mut [&R], spec: SortSpec<R::Field>) {
    records.sort_by(|a, b| {
        let ord = a.value(spec.field).cmp(&b.value(spec.field));
        match spec.direction {
            Direction::Asc => ord,
            Direction::Desc => ord.reverse(),
        }
    });
}

/// Number of pages needed for `count` items; zero for an empty set.
pub fn total_pages(count: usize, page_size: usize) -> usize {
    count.div_ceil(page_size.max(1))
}

/// Clamp a 1-based page index into `[1, max(1, total_pages)]`.
pub fn clamp_page(page_index: usize, count: usize, page_size: usize) -> usize {
    page_index.clamp(1, total_pages(count, page_size).max(1))
}

/// One page of records; an out-of-range page is empty.
pub fn paginate<T: Copy>(items: &[T], page_index: usize, page_size: usize) -> Vec<T> {
    let page_size = page_size.max(1);
    let start = page_index.saturating_sub(1).saturating_mul(page_size);
    items.iter().skip(start).take(page_size).copied().collect()
}

/// The visible slice of a list view.
#[derive(Debug, Clone)]
pub struct DerivedPage<'a, R> {
    pub rows: Vec<&'a R>,
    pub page_index: usize,
    pub page_size: usize,
    pub filtered_count: usize,
    pub total_pages: usize,
}

impl<R> DerivedPage<'_, R> {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 1-based position of the first row, 0 when empty.
    pub fn first_row(&self) -> usize {
        if self.rows.is_empty() {
            0
        } else {
            (self.page_index - 1) * self.page_size + 1
        }
    }

    /// 1-based position of the last row, 0 when empty.
    pub fn last_row(&self) -> usize {
        if self.rows.is_empty() {
            0
        } else {
            self.first_row() + self.rows.len() - 1
        }
    }
}

/// Run the whole derivation over `source`.
pub fn derive_page<'a, R, I>(
    source: I,
    search_fields: &[R::Field],
    term: &str,
    sort_spec: Option<SortSpec<R::Field>>,
    page_index: usize,
    page_size: usize,
) -> DerivedPage<'a, R>
where
    R: Record + 'a,
    I: IntoIterator<Item = &'a R>,
{
    let mut matched = filter(source, search_fields, term);
    if let Some(spec) = sort_spec {
        sort(&mut matched, spec);
    }

    DerivedPage {
        rows: paginate(&matched, page_index, page_size),
        page_index,
        page_size,
        filtered_count: matched.len(),
        total_pages: total_pages(matched.len(), page_size),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::cache::tests::{Col, Item, Tag, item};

    fn sample() -> Vec<Item> {
        vec![
            item("1", Tag::A, "Alpha", Some(3)),
            item("2", Tag::B, "beta", Some(1)),
            item("3", Tag::A, "Gamma", Some(3)),
            item("4", Tag::C, "ALPHABET", None),
            item("5", Tag::B, "delta", Some(1)),
        ]
    }

    fn ids(rows: &[&Item]) -> Vec<String> {
        rows.iter().map(|r| r.id.clone()).collect()
    }

    #[test]
    fn empty_term_keeps_everything_in_order() {
        let records = sample();
        let kept = filter(&records, &[Col::Name], "");
        assert_eq!(ids(&kept), vec!["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn filter_is_case_insensitive_substring() {
        let records = sample();
        let kept = filter(&records, &[Col::Name], "ALph");
        assert_eq!(ids(&kept), vec!["1", "4"]);
    }

    #[test]
    fn whitespace_is_part_of_the_term() {
        let records = vec![
            item("1", Tag::A, "IIT Delhi", None),
            item("2", Tag::B, "NITTrichy", None),
        ];
        assert_eq!(ids(&filter(&records, &[Col::Name], " ")), vec!["1"]);
        assert_eq!(ids(&filter(&records, &[Col::Name], "t d")), vec!["1"]);
        assert!(filter(&records, &[Col::Name], " nit").is_empty());
    }

    #[test]
    fn filter_matches_any_field() {
        let records = sample();
        let kept = filter(&records, &[Col::Name, Col::Rank], "1");
        assert_eq!(ids(&kept), vec!["2", "5"]);
    }

    #[test]
    fn facet_keeps_exact_matches_in_order() {
        let records = sample();
        assert_eq!(ids(&facet(&records, Col::Rank, "3")), vec!["1", "3"]);
        assert_eq!(ids(&facet(&records, Col::Name, "alpha")), vec!["1"]);
        assert!(facet(&records, Col::Name, "alp").is_empty());
    }

    #[test]
    fn sort_is_stable_in_both_directions() {
        let records = sample();
        let mut rows: Vec<&Item> = records.iter().collect();

        sort(&mut rows, SortSpec::asc(Col::Rank));
        assert_eq!(ids(&rows), vec!["2", "5", "1", "3", "4"]);

        let mut rows: Vec<&Item> = records.iter().collect();
        sort(
            &mut rows,
            SortSpec {
                field: Col::Rank,
                direction: Direction::Desc,
            },
        );
        assert_eq!(ids(&rows), vec!["4", "1", "3", "2", "5"]);
    }

    #[test]
    fn sort_text_is_lexicographic() {
        let records = sample();
        let mut rows: Vec<&Item> = records.iter().collect();
        sort(&mut rows, SortSpec::asc(Col::Name));
        assert_eq!(ids(&rows), vec!["4", "1", "3", "2", "5"]);
    }

    #[test]
    fn page_math() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(35, 10), 4);
        assert_eq!(total_pages(12, 10), 2);
        assert_eq!(clamp_page(0, 0, 10), 1);
        assert_eq!(clamp_page(9, 12, 10), 2);
        assert_eq!(clamp_page(2, 12, 10), 2);
    }

    #[test]
    fn out_of_range_page_is_empty() {
        let items = [1, 2, 3];
        assert_eq!(paginate(&items, 1, 2), vec![1, 2]);
        assert_eq!(paginate(&items, 2, 2), vec![3]);
        assert!(paginate(&items, 5, 2).is_empty());
    }

    #[test]
    fn derive_page_reports_counts() {
        let records = sample();
        let page = derive_page(
            &records,
            &[Col::Name],
            "a",
            Some(SortSpec::asc(Col::Name)),
            2,
            2,
        );
        assert_eq!(page.filtered_count, 5);
        assert_eq!(page.total_pages, 3);
        assert_eq!(ids(&page.rows), vec!["3", "2"]);
        assert_eq!(page.first_row(), 3);
        assert_eq!(page.last_row(), 4);
    }
}
