// src/pipeline/list_view.rs

//! Generic list view: lazily fetched per-type cache plus search, sort and
//! pagination state.
//!
//! ## Flow
//!
//! ```text
//! select_type ──▶ FetchTicket ──▶ RecordSource::fetch (per missing kind)
//!                                        │
//!                 complete_fetch ◀───────┘   (dropped if a newer ticket exists)
//!                       │
//!                 TypedCache ──▶ filter ──▶ sort ──▶ page ──▶ DerivedPage
//! ```
//!
//! Every fetch carries a generation number. Only the newest ticket may write
//! into the cache, so a slow response for a view the user already left is
//! discarded instead of overwriting newer state.

use std::fmt;

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};

use crate::error::Result;
use crate::models::Record;
use crate::pipeline::cache::TypedCache;
use crate::pipeline::derive::{self, DerivedPage, SortSpec};

/// Fetches every record of one kind from a backend.
#[async_trait]
pub trait RecordSource<R: Record>: Send + Sync {
    async fn fetch(&self, kind: R::Kind) -> Result<Vec<R>>;
}

/// Which kinds a view shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection<K> {
    All,
    Only(K),
}

impl<K: fmt::Display> fmt::Display for Selection<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("All"),
            Self::Only(kind) => kind.fmt(f),
        }
    }
}

/// Per-view configuration: which kinds exist and which columns are
/// searchable and sortable.
#[derive(Debug, Clone)]
pub struct ListViewConfig<R: Record> {
    /// Kinds in fetch order
    pub kinds: Vec<R::Kind>,
    pub search_fields: Vec<R::Field>,
    pub sort_fields: Vec<R::Field>,
    /// Column offered as a whole-value category filter
    pub facet_field: Option<R::Field>,
    pub page_size: usize,
    pub default_sort: Option<SortSpec<R::Field>>,
    /// Maximum kinds fetched at once; 1 fetches one at a time
    pub fetch_concurrency: usize,
}

impl<R: Record> ListViewConfig<R> {
    pub fn new(kinds: impl Into<Vec<R::Kind>>) -> Self {
        Self {
            kinds: kinds.into(),
            search_fields: Vec::new(),
            sort_fields: Vec::new(),
            facet_field: None,
            page_size: 10,
            default_sort: None,
            fetch_concurrency: 1,
        }
    }

    pub fn search(mut self, fields: impl Into<Vec<R::Field>>) -> Self {
        self.search_fields = fields.into();
        self
    }

    pub fn sortable(mut self, fields: impl Into<Vec<R::Field>>) -> Self {
        self.sort_fields = fields.into();
        self
    }

    pub fn facet(mut self, field: R::Field) -> Self {
        self.facet_field = Some(field);
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn default_sort(mut self, spec: SortSpec<R::Field>) -> Self {
        self.default_sort = Some(spec);
        self
    }

    pub fn fetch_concurrency(mut self, concurrency: usize) -> Self {
        self.fetch_concurrency = concurrency.max(1);
        self
    }
}

/// Current search/filter/sort/page settings of a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState<K, F> {
    pub search_term: String,
    pub selection: Selection<K>,
    /// Active category filter on the facet column
    pub facet: Option<String>,
    pub sort: Option<SortSpec<F>>,
    pub page_index: usize,
    pub page_size: usize,
}

/// Handle for one outstanding fetch.
#[derive(Debug, Clone)]
pub struct FetchTicket<K> {
    generation: u64,
    kinds: Vec<K>,
    concurrency: usize,
}

impl<K: Copy + fmt::Display + Send + Sync> FetchTicket<K> {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Kinds this ticket will fetch, in order.
    pub fn kinds(&self) -> &[K] {
        &self.kinds
    }

    /// Fetch every kind on the ticket. The first failure aborts the batch.
    ///
    /// Does not touch the view, so it can run while the view is borrowed
    /// elsewhere. Results keep the ticket's kind order.
    pub async fn run<R, S>(&self, source: &S) -> Result<Vec<(K, Vec<R>)>>
    where
        R: Record<Kind = K>,
        S: RecordSource<R> + ?Sized,
    {
        stream::iter(self.kinds.iter().copied())
            .map(|kind| async move {
                log::debug!("Fetching {kind}");
                source.fetch(kind).await.map(|records| (kind, records))
            })
            .buffered(self.concurrency)
            .try_collect()
            .await
    }
}

/// What a select or reload did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Everything needed was already cached
    Cached,
    /// This many kinds were fetched and cached
    Fetched(usize),
    /// A newer request superseded this one; the response was dropped
    Stale,
    /// A fetch was already in flight; nothing was started
    Busy,
}

/// A list view over records of type `R`.
#[derive(Debug)]
pub struct ListView<R: Record> {
    config: ListViewConfig<R>,
    cache: TypedCache<R>,
    state: ViewState<R::Kind, R::Field>,
    loading: bool,
    error: Option<String>,
    generation: u64,
}

impl<R: Record> ListView<R> {
    pub fn new(config: ListViewConfig<R>) -> Self {
        let state = ViewState {
            search_term: String::new(),
            selection: Selection::All,
            facet: None,
            sort: config.default_sort,
            page_index: 1,
            page_size: config.page_size.max(1),
        };
        Self {
            config,
            cache: TypedCache::new(),
            state,
            loading: false,
            error: None,
            generation: 0,
        }
    }

    pub fn config(&self) -> &ListViewConfig<R> {
        &self.config
    }

    pub fn state(&self) -> &ViewState<R::Kind, R::Field> {
        &self.state
    }

    pub fn cache(&self) -> &TypedCache<R> {
        &self.cache
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Message of the last failed fetch, cleared by the next fetch.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    // --- Selection & fetching ---

    /// Switch to `selection`, fetching any kind not cached yet.
    pub async fn select_type<S>(
        &mut self,
        source: &S,
        selection: Selection<R::Kind>,
    ) -> Result<FetchOutcome>
    where
        S: RecordSource<R> + ?Sized,
    {
        match self.begin_select(selection) {
            Some(ticket) => {
                let result = ticket.run(source).await;
                self.complete_fetch(&ticket, result)
            }
            None => Ok(FetchOutcome::Cached),
        }
    }

    /// Clear the cache and fetch the current selection again.
    ///
    /// Search and sort are kept; the page index is re-clamped once the
    /// fresh records arrive. Refused while another fetch is in flight.
    pub async fn reload<S>(&mut self, source: &S) -> Result<FetchOutcome>
    where
        S: RecordSource<R> + ?Sized,
    {
        match self.begin_reload() {
            Some(ticket) => {
                let result = ticket.run(source).await;
                self.complete_fetch(&ticket, result)
            }
            None if self.loading => Ok(FetchOutcome::Busy),
            None => Ok(FetchOutcome::Cached),
        }
    }

    /// First half of [`select_type`](Self::select_type).
    ///
    /// Resets search and page, and returns a ticket when something must be
    /// fetched. Any older ticket becomes stale.
    pub fn begin_select(
        &mut self,
        selection: Selection<R::Kind>,
    ) -> Option<FetchTicket<R::Kind>> {
        self.state.selection = selection;
        self.state.search_term.clear();
        self.state.page_index = 1;
        self.issue_ticket()
    }

    /// Narrow the view to `selection` without fetching.
    ///
    /// Drops whatever is cached, so the next reload fetches only the kinds
    /// `selection` covers. Any outstanding ticket becomes stale.
    pub fn set_selection(&mut self, selection: Selection<R::Kind>) {
        self.state.selection = selection;
        self.state.search_term.clear();
        self.state.page_index = 1;
        self.generation += 1;
        self.loading = false;
        self.invalidate_all();
    }

    /// First half of [`reload`](Self::reload). `None` while loading.
    pub fn begin_reload(&mut self) -> Option<FetchTicket<R::Kind>> {
        if self.loading {
            log::debug!("Reload skipped: fetch already in flight");
            return None;
        }
        self.invalidate_all();
        self.issue_ticket()
    }

    /// Apply the result of a ticket's fetch.
    ///
    /// Results for anything but the newest ticket are dropped. A failed
    /// batch leaves the cache exactly as it was before the ticket.
    pub fn complete_fetch(
        &mut self,
        ticket: &FetchTicket<R::Kind>,
        result: Result<Vec<(R::Kind, Vec<R>)>>,
    ) -> Result<FetchOutcome> {
        if ticket.generation != self.generation {
            log::debug!(
                "Dropping stale response (ticket {}, current {})",
                ticket.generation,
                self.generation
            );
            return Ok(FetchOutcome::Stale);
        }

        self.loading = false;
        match result {
            Ok(batches) => {
                let fetched = batches.len();
                for (kind, records) in batches {
                    log::debug!("Cached {} records for {}", records.len(), kind);
                    self.cache.insert(kind, records);
                }
                self.reclamp();
                Ok(FetchOutcome::Fetched(fetched))
            }
            Err(e) => {
                log::warn!("Fetch for {} failed: {}", self.state.selection, e);
                self.error = Some(e.user_message());
                self.reclamp();
                Err(e)
            }
        }
    }

    fn issue_ticket(&mut self) -> Option<FetchTicket<R::Kind>> {
        self.generation += 1;
        let wanted = match self.state.selection {
            Selection::All => self.config.kinds.clone(),
            Selection::Only(kind) => vec![kind],
        };
        let missing = self.cache.missing(&wanted);

        if missing.is_empty() {
            self.loading = false;
            self.reclamp();
            return None;
        }

        self.loading = true;
        self.error = None;
        Some(FetchTicket {
            generation: self.generation,
            kinds: missing,
            concurrency: self.config.fetch_concurrency.max(1),
        })
    }

    /// Drop every cached kind. The next select or reload fetches again.
    pub fn invalidate_all(&mut self) {
        log::debug!("Invalidating {} cached records", self.cache.len());
        self.cache.clear();
    }

    // --- View state ---

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.state.search_term = term.into();
        self.state.page_index = 1;
    }

    /// Show only records whose facet column equals `value`; `None` shows all.
    ///
    /// Resets search and page like a type switch. Returns `false` and changes
    /// nothing when the view has no facet column.
    pub fn set_facet(&mut self, value: Option<&str>) -> bool {
        if self.config.facet_field.is_none() {
            return false;
        }
        self.state.facet = value.map(str::to_string);
        self.state.search_term.clear();
        self.state.page_index = 1;
        true
    }

    /// Sort by `field`, toggling direction if it is already the sort column.
    ///
    /// Returns `false` and changes nothing if the column is not sortable.
    pub fn set_sort(&mut self, field: R::Field) -> bool {
        if !self.config.sort_fields.contains(&field) {
            return false;
        }
        self.state.sort = Some(match self.state.sort {
            Some(current) if current.field == field => SortSpec {
                field,
                direction: current.direction.toggled(),
            },
            _ => SortSpec::asc(field),
        });
        true
    }

    /// Apply raw page-size input. Anything but a positive integer is ignored.
    pub fn set_page_size(&mut self, input: &str) -> bool {
        match input.trim().parse::<usize>() {
            Ok(n) if n > 0 => {
                self.state.page_size = n;
                self.state.page_index = 1;
                true
            }
            _ => false,
        }
    }

    /// Jump to a page, clamped into the valid range.
    pub fn set_page_index(&mut self, page_index: usize) {
        self.state.page_index =
            derive::clamp_page(page_index, self.filtered_count(), self.state.page_size);
    }

    // --- Cache patches ---

    /// Remove a record after a successful delete.
    pub fn remove_record(&mut self, kind: R::Kind, id: &str) -> Option<R> {
        let removed = self.cache.remove(kind, id);
        self.reclamp();
        removed
    }

    /// Patch an updated record into the cache.
    pub fn replace_record(&mut self, record: R) -> bool {
        let replaced = self.cache.replace(record);
        self.reclamp();
        replaced
    }

    // --- Derivation ---

    fn source(&self) -> Vec<&R> {
        let records: Vec<&R> = match self.state.selection {
            Selection::All => self.cache.all().collect(),
            Selection::Only(kind) => self
                .cache
                .get(kind)
                .map(|records| records.iter().collect())
                .unwrap_or_default(),
        };
        match (self.config.facet_field, self.state.facet.as_deref()) {
            (Some(field), Some(value)) => derive::facet(records, field, value),
            _ => records,
        }
    }

    /// Number of records matching the current selection and search.
    pub fn filtered_count(&self) -> usize {
        derive::filter(self.source(), &self.config.search_fields, &self.state.search_term).len()
    }

    /// The visible page for the current state.
    pub fn page(&self) -> DerivedPage<'_, R> {
        derive::derive_page(
            self.source(),
            &self.config.search_fields,
            &self.state.search_term,
            self.state.sort,
            self.state.page_index,
            self.state.page_size,
        )
    }

    fn reclamp(&mut self) {
        self.set_page_index(self.state.page_index);
    }
}
