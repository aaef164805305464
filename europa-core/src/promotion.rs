//! Manual promotion workflow
//!
//! State machine behind the "promote image" panel. The panel opens on a
//! gated stage with the repository feeding it. The user then picks a pushed
//! event from that repository, adjusts the destination tag and confirms.
//!
//! ```text
//! Idle -> SelectingSource -> SourceSelected <-> Ready -> Submitting -> Committed
//!   \___________\________________\______________/
//!                        cancel -> Cancelled
//! ```
//!
//! The workflow performs no I/O. Transitions that need the backend hand back a
//! request stamped with a [`Ticket`]; the caller performs it and reports the
//! outcome with the same ticket. Outcomes carrying a ticket the workflow no
//! longer waits for (superseded, cancelled or committed) are ignored.

use thiserror::Error;

use crate::domain::component::CopyToRepository;
use crate::domain::event::{EventPage, RepoEvent};
use crate::domain::pipeline::Pipeline;
use crate::domain::repo::RepoMap;
use crate::dto::pipeline::PromoteStage;
use crate::dto::repo::ListRepoEvents;
use crate::tag::is_valid_tag;

/// Image SHA shown for a destination repository that has no events yet
pub const UNKNOWN_IMAGE_SHA: &str = "N/A";

/// Errors surfaced by the promotion workflow
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromotionError {
    #[error("Missing required data to promote")]
    MissingData,

    #[error("The specified destination tag is not valid: '{tag}'")]
    InvalidTag { tag: String },

    #[error("Pipeline component {component_id} is no longer part of pipeline {pipeline_id}")]
    DanglingComponent {
        pipeline_id: String,
        component_id: String,
    },

    #[error("Missing data for promotion stage: repository {repo_id} is not available")]
    MissingRepository { repo_id: String },

    #[error("Event {event_id} is not a push to the source repository")]
    UnselectableEvent { event_id: String },

    #[error("The promotion panel has not been shown yet")]
    NotShown,

    #[error("A promotion is already being submitted")]
    Busy,

    #[error("The promotion panel is closed")]
    Closed,

    #[error("There was an error loading repository events: {0}")]
    EventsUnavailable(String),

    #[error("{0}")]
    Backend(String),
}

impl PromotionError {
    /// Whether the panel can only show a "missing data" message
    pub fn is_blocking(&self) -> bool {
        matches!(self, PromotionError::MissingRepository { .. })
    }
}

/// Phase of the promotion workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromotionPhase {
    /// Opened, not rendered yet
    Idle,
    /// Waiting for the user to pick a source event
    SelectingSource,
    /// A source is picked but the destination tag is missing or invalid
    SourceSelected,
    /// Everything is in place; confirm is available
    Ready,
    /// The promotion request is in flight
    Submitting,
    Committed,
    Cancelled,
}

impl PromotionPhase {
    /// Whether the panel has been closed
    pub fn is_closed(&self) -> bool {
        matches!(self, PromotionPhase::Committed | PromotionPhase::Cancelled)
    }
}

impl std::fmt::Display for PromotionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PromotionPhase::Idle => write!(f, "Idle"),
            PromotionPhase::SelectingSource => write!(f, "Selecting source"),
            PromotionPhase::SourceSelected => write!(f, "Source selected"),
            PromotionPhase::Ready => write!(f, "Ready"),
            PromotionPhase::Submitting => write!(f, "Submitting"),
            PromotionPhase::Committed => write!(f, "Committed"),
            PromotionPhase::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// Identifies one outstanding request issued by the workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

/// Event listing the caller should perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventsQuery {
    pub ticket: Ticket,
    pub query: ListRepoEvents,
}

/// Promotion request the caller should submit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromoteCommand {
    pub ticket: Ticket,
    pub request: PromoteStage,
}

/// Direction for paging through source events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageDirection {
    /// Towards older events
    Forward,
    /// Towards newer events
    Backward,
}

/// What the panel shows about the destination repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationSummary {
    pub repo_id: String,
    pub repo_name: String,
    pub image_tags: Vec<String>,
    pub image_sha: String,
    pub event_time: Option<i64>,
}

/// Manual promotion state machine
#[derive(Debug, Clone)]
pub struct PromotionWorkflow {
    phase: PromotionPhase,
    pipeline_id: String,
    source_repo_id: Option<String>,
    destination_component: Option<CopyToRepository>,
    source_event: Option<RepoEvent>,
    source_tag: Option<String>,
    destination_tag: Option<String>,
    tag_invalid: bool,
    error: Option<PromotionError>,
    events: Vec<RepoEvent>,
    prev_marker: Option<String>,
    next_marker: Option<String>,
    event_filter: String,
    next_ticket: u64,
    pending_events: Option<Ticket>,
    pending_promotion: Option<Ticket>,
}

impl PromotionWorkflow {
    /// Open the workflow for promoting from `source_repo_id` into `destination_component`
    pub fn open(
        pipeline_id: impl Into<String>,
        source_repo_id: impl Into<String>,
        destination_component: CopyToRepository,
    ) -> Self {
        Self {
            phase: PromotionPhase::Idle,
            pipeline_id: pipeline_id.into(),
            source_repo_id: Some(source_repo_id.into()),
            destination_component: Some(destination_component),
            source_event: None,
            source_tag: None,
            destination_tag: None,
            tag_invalid: false,
            error: None,
            events: Vec::new(),
            prev_marker: None,
            next_marker: None,
            event_filter: String::new(),
            next_ticket: 0,
            pending_events: None,
            pending_promotion: None,
        }
    }

    // =============================================================================
    // Accessors
    // =============================================================================

    pub fn phase(&self) -> PromotionPhase {
        self.phase
    }

    pub fn pipeline_id(&self) -> &str {
        &self.pipeline_id
    }

    pub fn source_repo_id(&self) -> Option<&str> {
        self.source_repo_id.as_deref()
    }

    pub fn destination_component(&self) -> Option<&CopyToRepository> {
        self.destination_component.as_ref()
    }

    pub fn source_event(&self) -> Option<&RepoEvent> {
        self.source_event.as_ref()
    }

    pub fn source_tag(&self) -> Option<&str> {
        self.source_tag.as_deref()
    }

    pub fn destination_tag(&self) -> Option<&str> {
        self.destination_tag.as_deref()
    }

    /// Whether the current destination tag fails the tag rule
    pub fn is_tag_invalid(&self) -> bool {
        self.tag_invalid
    }

    pub fn error(&self) -> Option<&PromotionError> {
        self.error.as_ref()
    }

    /// Whether the confirm control should be offered
    pub fn can_confirm(&self) -> bool {
        self.phase == PromotionPhase::Ready
    }

    pub fn is_loading_events(&self) -> bool {
        self.pending_events.is_some()
    }

    pub fn event_filter(&self) -> &str {
        &self.event_filter
    }

    /// Push events of the source repository matching the tag filter, newest first
    pub fn visible_events(&self) -> Vec<&RepoEvent> {
        let mut events: Vec<_> = self
            .events
            .iter()
            .filter(|event| event.is_push() && event.matches_tag(&self.event_filter))
            .collect();
        events.sort_by(|a, b| b.event_time.cmp(&a.event_time));
        events
    }

    /// Describe the destination repository and its latest event
    pub fn destination_summary(&self, repos: &RepoMap) -> Result<DestinationSummary, PromotionError> {
        let repo_id = self
            .destination_component
            .as_ref()
            .and_then(|c| c.destination_container_repo_id.as_deref())
            .ok_or(PromotionError::MissingData)?;
        let repo = repos
            .get(repo_id)
            .ok_or_else(|| PromotionError::MissingRepository {
                repo_id: repo_id.to_string(),
            })?;

        let summary = match &repo.last_event {
            Some(event) => DestinationSummary {
                repo_id: repo.id.clone(),
                repo_name: repo.name.clone(),
                image_tags: event.image_tags.clone(),
                image_sha: event
                    .image_sha
                    .clone()
                    .unwrap_or_else(|| UNKNOWN_IMAGE_SHA.to_string()),
                event_time: event.event_time,
            },
            None => DestinationSummary {
                repo_id: repo.id.clone(),
                repo_name: repo.name.clone(),
                image_tags: Vec::new(),
                image_sha: UNKNOWN_IMAGE_SHA.to_string(),
                event_time: None,
            },
        };

        Ok(summary)
    }

    // =============================================================================
    // Transitions
    // =============================================================================

    /// Render the panel: `Idle -> SelectingSource`
    ///
    /// Both repositories must be known to the caller. Returns the first event
    /// listing to perform for the source repository.
    pub fn show(&mut self, repos: &RepoMap) -> Result<EventsQuery, PromotionError> {
        if self.phase.is_closed() {
            return Err(PromotionError::Closed);
        }
        if self.phase != PromotionPhase::Idle {
            return self.refresh_events();
        }

        if let Err(e) = self.check_repositories(repos) {
            self.error = Some(e.clone());
            return Err(e);
        }

        self.phase = PromotionPhase::SelectingSource;
        self.refresh_events()
    }

    /// Reload the first page of source events
    pub fn refresh_events(&mut self) -> Result<EventsQuery, PromotionError> {
        self.events_query(None, false)
    }

    /// Load the next or previous page of source events, if there is one
    pub fn page_events(
        &mut self,
        direction: PageDirection,
    ) -> Result<Option<EventsQuery>, PromotionError> {
        let marker = match direction {
            PageDirection::Forward => self.next_marker.clone(),
            PageDirection::Backward => self.prev_marker.clone(),
        };
        match marker {
            Some(marker) => self
                .events_query(Some(marker), direction == PageDirection::Backward)
                .map(Some),
            None => Ok(None),
        }
    }

    /// Report the outcome of an event listing
    ///
    /// Returns `false` when the ticket is stale and the outcome was ignored.
    pub fn events_loaded(&mut self, ticket: Ticket, outcome: Result<EventPage, String>) -> bool {
        if self.pending_events != Some(ticket) {
            return false;
        }
        self.pending_events = None;

        match outcome {
            Ok(page) => {
                self.events = page.events;
                self.prev_marker = page.prev_marker;
                self.next_marker = page.next_marker;
                if matches!(self.error, Some(PromotionError::EventsUnavailable(_))) {
                    self.error = None;
                }
            }
            Err(message) => {
                self.error = Some(PromotionError::EventsUnavailable(message));
            }
        }
        true
    }

    /// Restrict the visible events to those with a tag containing `filter`
    pub fn set_event_filter(&mut self, filter: impl Into<String>) {
        self.event_filter = filter.into();
    }

    /// Pick the source image
    ///
    /// Only push events of the source repository qualify. The source tag
    /// becomes the event's image SHA and the destination tag is reseeded with
    /// the event's first tag, replacing any manual edit.
    pub fn select_event(&mut self, event: RepoEvent) -> Result<(), PromotionError> {
        self.ensure_editable()?;

        let foreign = match (event.repo_id.as_deref(), self.source_repo_id.as_deref()) {
            (Some(repo_id), Some(source)) => repo_id != source,
            _ => false,
        };
        if !event.is_push() || foreign {
            return Err(PromotionError::UnselectableEvent { event_id: event.id });
        }

        self.source_tag = event.image_sha.clone();
        self.destination_tag = event.image_tags.first().cloned();
        self.source_event = Some(event);
        self.revalidate_tag();
        self.settle();
        Ok(())
    }

    /// Edit the destination tag
    pub fn set_destination_tag(&mut self, tag: impl Into<String>) -> Result<(), PromotionError> {
        self.ensure_editable()?;

        self.destination_tag = Some(tag.into());
        self.revalidate_tag();
        self.settle();
        Ok(())
    }

    /// Confirm the promotion: `Ready -> Submitting`
    ///
    /// `pipeline` is the caller's current copy, which may have been refreshed
    /// since the panel opened. Every local check failure is recorded as the
    /// surfaced error and nothing is submitted.
    pub fn confirm(
        &mut self,
        pipeline: &Pipeline,
        repos: &RepoMap,
    ) -> Result<PromoteCommand, PromotionError> {
        match self.phase {
            PromotionPhase::Submitting => return Err(PromotionError::Busy),
            PromotionPhase::Committed | PromotionPhase::Cancelled => {
                return Err(PromotionError::Closed);
            }
            _ => {}
        }

        let request = match self.build_request(pipeline, repos) {
            Ok(request) => request,
            Err(e) => {
                self.error = Some(e.clone());
                return Err(e);
            }
        };

        let ticket = self.issue_ticket();
        self.pending_promotion = Some(ticket);
        self.phase = PromotionPhase::Submitting;
        self.error = None;

        Ok(PromoteCommand { ticket, request })
    }

    /// Report a successful promotion: `Submitting -> Committed`
    ///
    /// Clears the selection and hands back the updated pipeline, which
    /// replaces the caller's copy. Returns `None` for a stale ticket.
    pub fn promotion_succeeded(&mut self, ticket: Ticket, pipeline: Pipeline) -> Option<Pipeline> {
        if self.pending_promotion != Some(ticket) {
            return None;
        }
        self.close(PromotionPhase::Committed);
        Some(pipeline)
    }

    /// Report a rejected promotion
    ///
    /// The selection is kept so the user can edit and retry. Returns `false`
    /// for a stale ticket.
    pub fn promotion_failed(&mut self, ticket: Ticket, message: impl Into<String>) -> bool {
        if self.pending_promotion != Some(ticket) {
            return false;
        }
        self.pending_promotion = None;

        let message = message.into();
        self.error = Some(PromotionError::Backend(if message.is_empty() {
            "There was an error promoting the image".to_string()
        } else {
            message
        }));
        self.settle();
        true
    }

    /// Close the panel without promoting
    pub fn cancel(&mut self) -> Result<(), PromotionError> {
        if self.phase == PromotionPhase::Submitting {
            return Err(PromotionError::Busy);
        }
        if !self.phase.is_closed() {
            self.close(PromotionPhase::Cancelled);
        }
        Ok(())
    }

    /// Dismiss the surfaced error message
    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    // =============================================================================
    // Internals
    // =============================================================================

    fn issue_ticket(&mut self) -> Ticket {
        self.next_ticket += 1;
        Ticket(self.next_ticket)
    }

    fn events_query(
        &mut self,
        marker: Option<String>,
        backward: bool,
    ) -> Result<EventsQuery, PromotionError> {
        if self.phase.is_closed() {
            return Err(PromotionError::Closed);
        }
        let repo_id = self
            .source_repo_id
            .clone()
            .ok_or(PromotionError::MissingData)?;

        let ticket = self.issue_ticket();
        self.pending_events = Some(ticket);

        Ok(EventsQuery {
            ticket,
            query: ListRepoEvents {
                repo_id,
                marker,
                backward,
            },
        })
    }

    fn ensure_editable(&self) -> Result<(), PromotionError> {
        match self.phase {
            PromotionPhase::Idle => Err(PromotionError::NotShown),
            PromotionPhase::Submitting => Err(PromotionError::Busy),
            PromotionPhase::Committed | PromotionPhase::Cancelled => Err(PromotionError::Closed),
            _ => Ok(()),
        }
    }

    fn revalidate_tag(&mut self) {
        self.tag_invalid = self
            .destination_tag
            .as_deref()
            .is_some_and(|tag| !is_valid_tag(tag));
    }

    /// Derive the editing phase from the selected data
    fn settle(&mut self) {
        self.phase = match (&self.source_tag, &self.destination_tag) {
            (None, _) => PromotionPhase::SelectingSource,
            (Some(_), Some(_)) if !self.tag_invalid => PromotionPhase::Ready,
            (Some(_), _) => PromotionPhase::SourceSelected,
        };
    }

    fn check_repositories(&self, repos: &RepoMap) -> Result<(), PromotionError> {
        let source = self
            .source_repo_id
            .as_deref()
            .ok_or(PromotionError::MissingData)?;
        let destination = self
            .destination_component
            .as_ref()
            .and_then(|c| c.destination_container_repo_id.as_deref())
            .ok_or(PromotionError::MissingData)?;

        for repo_id in [source, destination] {
            if !repos.contains(repo_id) {
                return Err(PromotionError::MissingRepository {
                    repo_id: repo_id.to_string(),
                });
            }
        }
        Ok(())
    }

    fn build_request(
        &self,
        pipeline: &Pipeline,
        repos: &RepoMap,
    ) -> Result<PromoteStage, PromotionError> {
        let (Some(component), Some(source_repo_id), Some(source_tag), Some(destination_tag)) = (
            self.destination_component.as_ref(),
            self.source_repo_id.as_deref(),
            self.source_tag.as_deref(),
            self.destination_tag.as_deref(),
        ) else {
            return Err(PromotionError::MissingData);
        };
        if self.pipeline_id.is_empty() || component.id.is_empty() {
            return Err(PromotionError::MissingData);
        }

        if !is_valid_tag(destination_tag) {
            return Err(PromotionError::InvalidTag {
                tag: destination_tag.to_string(),
            });
        }

        let dangling = || PromotionError::DanglingComponent {
            pipeline_id: self.pipeline_id.clone(),
            component_id: component.id.clone(),
        };
        if !pipeline.id.eq_ignore_ascii_case(&self.pipeline_id) {
            return Err(dangling());
        }
        let current = pipeline.copy_stage(&component.id).ok_or_else(dangling)?;

        let destination_repo_id = current
            .destination_container_repo_id
            .as_deref()
            .ok_or(PromotionError::MissingData)?;
        for repo_id in [source_repo_id, destination_repo_id] {
            if !repos.contains(repo_id) {
                return Err(PromotionError::MissingRepository {
                    repo_id: repo_id.to_string(),
                });
            }
        }

        Ok(PromoteStage {
            pipeline_id: self.pipeline_id.clone(),
            component_id: current.id.clone(),
            source_repo_id: source_repo_id.to_string(),
            source_tag: source_tag.to_string(),
            destination_tag: destination_tag.to_string(),
        })
    }

    fn close(&mut self, phase: PromotionPhase) {
        self.phase = phase;
        self.source_repo_id = None;
        self.destination_component = None;
        self.source_event = None;
        self.source_tag = None;
        self.destination_tag = None;
        self.tag_invalid = false;
        self.events.clear();
        self.prev_marker = None;
        self.next_marker = None;
        self.pending_events = None;
        self.pending_promotion = None;
        self.error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::component::ManualPromotionGate;
    use crate::domain::event::EventType;
    use crate::domain::repo::Repo;

    fn repo(id: &str, last_event: Option<RepoEvent>) -> Repo {
        Repo {
            id: id.to_string(),
            domain: Some("d0".to_string()),
            name: format!("repo-{id}"),
            provider: None,
            last_event,
            local: true,
            mirror: false,
        }
    }

    fn repos() -> RepoMap {
        vec![repo("src", None), repo("dst", None)].into()
    }

    fn event(id: &str, time: i64, event_type: EventType, tags: &[&str]) -> RepoEvent {
        RepoEvent {
            id: id.to_string(),
            repo_id: Some("src".to_string()),
            event_time: Some(time),
            event_type,
            image_tags: tags.iter().map(|t| t.to_string()).collect(),
            image_sha: Some(format!("sha256:{id}")),
        }
    }

    fn stage() -> CopyToRepository {
        CopyToRepository::new("stage", "dst")
    }

    fn pipeline() -> Pipeline {
        Pipeline {
            id: "d0:p1".to_string(),
            name: "release".to_string(),
            domain: None,
            container_repo_id: Some("src".to_string()),
            components: vec![ManualPromotionGate::new("gate").into(), stage().into()],
        }
    }

    fn shown() -> (PromotionWorkflow, EventsQuery) {
        let mut workflow = PromotionWorkflow::open("d0:p1", "src", stage());
        let query = workflow.show(&repos()).unwrap();
        (workflow, query)
    }

    fn ready() -> PromotionWorkflow {
        let (mut workflow, _) = shown();
        workflow
            .select_event(event("e1", 1, EventType::Push, &["v1"]))
            .unwrap();
        workflow
    }

    #[test]
    fn test_show_moves_to_selecting_source() {
        let (workflow, query) = shown();
        assert_eq!(workflow.phase(), PromotionPhase::SelectingSource);
        assert_eq!(query.query, ListRepoEvents::first_page("src"));
        assert!(workflow.is_loading_events());
    }

    #[test]
    fn test_show_with_missing_repository_blocks() {
        let mut workflow = PromotionWorkflow::open("d0:p1", "src", stage());
        let repos: RepoMap = vec![repo("src", None)].into();

        let err = workflow.show(&repos).unwrap_err();
        assert!(err.is_blocking());
        assert_eq!(workflow.phase(), PromotionPhase::Idle);
        assert_eq!(workflow.error(), Some(&err));
    }

    #[test]
    fn test_destination_summary_defaults() {
        let workflow = PromotionWorkflow::open("d0:p1", "src", stage());
        let summary = workflow.destination_summary(&repos()).unwrap();
        assert_eq!(summary.repo_name, "repo-dst");
        assert!(summary.image_tags.is_empty());
        assert_eq!(summary.image_sha, UNKNOWN_IMAGE_SHA);
    }

    #[test]
    fn test_destination_summary_uses_last_event() {
        let workflow = PromotionWorkflow::open("d0:p1", "src", stage());
        let repos: RepoMap = vec![
            repo("src", None),
            repo("dst", Some(event("last", 9, EventType::Push, &["prod"]))),
        ]
        .into();
        let summary = workflow.destination_summary(&repos).unwrap();
        assert_eq!(summary.image_tags, vec!["prod"]);
        assert_eq!(summary.image_sha, "sha256:last");
        assert_eq!(summary.event_time, Some(9));
    }

    #[test]
    fn test_visible_events_filters_and_sorts() {
        let (mut workflow, query) = shown();
        let page = EventPage {
            events: vec![
                event("old", 1, EventType::Push, &["v1"]),
                event("pull", 5, EventType::Pull, &["v2"]),
                event("new", 3, EventType::Push, &["v2", "latest"]),
            ],
            prev_marker: None,
            next_marker: Some("m2".to_string()),
        };
        assert!(workflow.events_loaded(query.ticket, Ok(page)));

        let ids: Vec<_> = workflow
            .visible_events()
            .into_iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(ids, vec!["new", "old"]);

        workflow.set_event_filter("lat");
        let ids: Vec<_> = workflow
            .visible_events()
            .into_iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(ids, vec!["new"]);
    }

    #[test]
    fn test_stale_event_page_is_ignored() {
        let (mut workflow, first) = shown();
        let second = workflow.refresh_events().unwrap();

        assert!(!workflow.events_loaded(first.ticket, Ok(EventPage::default())));
        assert!(workflow.is_loading_events());
        assert!(workflow.events_loaded(second.ticket, Ok(EventPage::default())));
        assert!(!workflow.is_loading_events());
    }

    #[test]
    fn test_event_listing_failure_is_surfaced() {
        let (mut workflow, query) = shown();
        assert!(workflow.events_loaded(query.ticket, Err("boom".to_string())));
        assert_eq!(
            workflow.error(),
            Some(&PromotionError::EventsUnavailable("boom".to_string()))
        );
        assert_eq!(workflow.phase(), PromotionPhase::SelectingSource);

        let retry = workflow.refresh_events().unwrap();
        assert!(workflow.events_loaded(retry.ticket, Ok(EventPage::default())));
        assert!(workflow.error().is_none());
    }

    #[test]
    fn test_page_events_uses_markers() {
        let (mut workflow, query) = shown();
        workflow.events_loaded(
            query.ticket,
            Ok(EventPage {
                events: vec![],
                prev_marker: None,
                next_marker: Some("m2".to_string()),
            }),
        );

        assert_eq!(workflow.page_events(PageDirection::Backward).unwrap(), None);
        let next = workflow
            .page_events(PageDirection::Forward)
            .unwrap()
            .unwrap();
        assert_eq!(next.query.marker.as_deref(), Some("m2"));
        assert!(!next.query.backward);
    }

    #[test]
    fn test_select_event_seeds_tags() {
        let workflow = ready();
        assert_eq!(workflow.phase(), PromotionPhase::Ready);
        assert_eq!(workflow.source_tag(), Some("sha256:e1"));
        assert_eq!(workflow.destination_tag(), Some("v1"));
        assert!(workflow.can_confirm());
    }

    #[test]
    fn test_select_event_overwrites_manual_tag() {
        let mut workflow = ready();
        workflow.set_destination_tag("custom").unwrap();
        assert_eq!(workflow.destination_tag(), Some("custom"));

        workflow
            .select_event(event("e2", 2, EventType::Push, &["v2", "latest"]))
            .unwrap();
        assert_eq!(workflow.destination_tag(), Some("v2"));
        assert_eq!(workflow.source_tag(), Some("sha256:e2"));
    }

    #[test]
    fn test_untagged_event_needs_a_destination_tag() {
        let (mut workflow, _) = shown();
        workflow
            .select_event(event("e1", 1, EventType::Push, &[]))
            .unwrap();
        assert_eq!(workflow.phase(), PromotionPhase::SourceSelected);
        assert_eq!(workflow.destination_tag(), None);

        workflow.set_destination_tag("v1").unwrap();
        assert_eq!(workflow.phase(), PromotionPhase::Ready);
    }

    #[test]
    fn test_invalid_tag_blocks_confirm_but_keeps_data() {
        let mut workflow = ready();
        workflow.set_destination_tag("-bad").unwrap();

        assert!(workflow.is_tag_invalid());
        assert_eq!(workflow.phase(), PromotionPhase::SourceSelected);
        assert!(workflow.source_event().is_some());
        assert_eq!(
            workflow.confirm(&pipeline(), &repos()),
            Err(PromotionError::InvalidTag {
                tag: "-bad".to_string()
            })
        );

        workflow.set_destination_tag("good").unwrap();
        assert!(!workflow.is_tag_invalid());
        assert_eq!(workflow.phase(), PromotionPhase::Ready);
    }

    #[test]
    fn test_confirm_without_source_is_missing_data() {
        let (mut workflow, _) = shown();
        workflow.set_destination_tag("v1").unwrap();

        let err = workflow.confirm(&pipeline(), &repos()).unwrap_err();
        assert_eq!(err, PromotionError::MissingData);
        assert_eq!(err.to_string(), "Missing required data to promote");
        assert_eq!(workflow.error(), Some(&PromotionError::MissingData));
        assert_eq!(workflow.phase(), PromotionPhase::SelectingSource);
    }

    #[test]
    fn test_confirm_with_event_lacking_sha_is_missing_data() {
        let (mut workflow, _) = shown();
        let mut no_sha = event("e1", 1, EventType::Push, &["v1"]);
        no_sha.image_sha = None;
        workflow.select_event(no_sha).unwrap();

        assert_eq!(
            workflow.confirm(&pipeline(), &repos()),
            Err(PromotionError::MissingData)
        );
    }

    #[test]
    fn test_confirm_builds_request() {
        let mut workflow = ready();
        let command = workflow.confirm(&pipeline(), &repos()).unwrap();

        assert_eq!(workflow.phase(), PromotionPhase::Submitting);
        assert!(!workflow.can_confirm());
        assert_eq!(
            command.request,
            PromoteStage {
                pipeline_id: "d0:p1".to_string(),
                component_id: "stage".to_string(),
                source_repo_id: "src".to_string(),
                source_tag: "sha256:e1".to_string(),
                destination_tag: "v1".to_string(),
            }
        );
        assert_eq!(
            workflow.confirm(&pipeline(), &repos()),
            Err(PromotionError::Busy)
        );
    }

    #[test]
    fn test_confirm_rejects_dangling_component() {
        let mut workflow = ready();
        let mut refreshed = pipeline();
        refreshed.components.truncate(1);

        assert_eq!(
            workflow.confirm(&refreshed, &repos()),
            Err(PromotionError::DanglingComponent {
                pipeline_id: "d0:p1".to_string(),
                component_id: "stage".to_string(),
            })
        );
        assert_eq!(workflow.phase(), PromotionPhase::Ready);
    }

    #[test]
    fn test_confirm_rejects_unresolved_repository() {
        let mut workflow = ready();
        let repos: RepoMap = vec![repo("src", None)].into();

        let err = workflow.confirm(&pipeline(), &repos).unwrap_err();
        assert!(err.is_blocking());
        assert_eq!(workflow.phase(), PromotionPhase::Ready);
    }

    #[test]
    fn test_success_clears_selection() {
        let mut workflow = ready();
        let command = workflow.confirm(&pipeline(), &repos()).unwrap();

        let replaced = workflow.promotion_succeeded(command.ticket, pipeline());
        assert_eq!(replaced, Some(pipeline()));
        assert_eq!(workflow.phase(), PromotionPhase::Committed);
        assert!(workflow.source_event().is_none());
        assert!(workflow.source_tag().is_none());
        assert!(workflow.source_repo_id().is_none());
        assert!(workflow.destination_component().is_none());
        assert!(workflow.destination_tag().is_none());
    }

    #[test]
    fn test_failure_keeps_selection_for_retry() {
        let mut workflow = ready();
        let command = workflow.confirm(&pipeline(), &repos()).unwrap();

        assert!(workflow.promotion_failed(command.ticket, "The specified source repo was not found"));
        assert_eq!(workflow.phase(), PromotionPhase::Ready);
        assert_eq!(
            workflow.error(),
            Some(&PromotionError::Backend(
                "The specified source repo was not found".to_string()
            ))
        );
        assert_eq!(workflow.destination_tag(), Some("v1"));

        workflow.dismiss_error();
        assert!(workflow.error().is_none());
        let retry = workflow.confirm(&pipeline(), &repos()).unwrap();
        assert_ne!(retry.ticket, command.ticket);
    }

    #[test]
    fn test_failure_with_empty_message() {
        let mut workflow = ready();
        let command = workflow.confirm(&pipeline(), &repos()).unwrap();
        workflow.promotion_failed(command.ticket, "");
        assert!(matches!(workflow.error(), Some(PromotionError::Backend(msg)) if !msg.is_empty()));
    }

    #[test]
    fn test_cancel_discards_selection() {
        let mut workflow = ready();
        workflow.cancel().unwrap();

        assert_eq!(workflow.phase(), PromotionPhase::Cancelled);
        assert!(workflow.destination_tag().is_none());
        assert_eq!(
            workflow.set_destination_tag("v2"),
            Err(PromotionError::Closed)
        );
        assert!(workflow.cancel().is_ok());
    }

    #[test]
    fn test_select_rejects_non_push_events() {
        let (mut workflow, _) = shown();
        for event_type in [EventType::Pull, EventType::Sync, EventType::Unknown] {
            assert_eq!(
                workflow.select_event(event("e1", 1, event_type, &["v1"])),
                Err(PromotionError::UnselectableEvent {
                    event_id: "e1".to_string()
                })
            );
        }
        assert_eq!(workflow.phase(), PromotionPhase::SelectingSource);
        assert!(workflow.source_tag().is_none());
    }

    #[test]
    fn test_select_rejects_event_of_another_repository() {
        let (mut workflow, _) = shown();
        let mut other = event("e1", 1, EventType::Push, &["v1"]);
        other.repo_id = Some("dst".to_string());

        assert!(matches!(
            workflow.select_event(other),
            Err(PromotionError::UnselectableEvent { .. })
        ));
        assert!(workflow.source_event().is_none());
        assert!(!workflow.can_confirm());
    }

    #[test]
    fn test_editing_before_show_is_refused() {
        let mut workflow = PromotionWorkflow::open("d0:p1", "src", stage());
        assert_eq!(
            workflow.select_event(event("e1", 1, EventType::Push, &["v1"])),
            Err(PromotionError::NotShown)
        );
        assert_eq!(
            workflow.set_destination_tag("v1"),
            Err(PromotionError::NotShown)
        );
        assert_eq!(workflow.phase(), PromotionPhase::Idle);
    }

    #[test]
    fn test_cancel_clears_surfaced_error() {
        let (mut workflow, query) = shown();
        workflow.events_loaded(query.ticket, Err("boom".to_string()));
        assert!(workflow.error().is_some());

        workflow.cancel().unwrap();
        assert!(workflow.error().is_none());
    }

    #[test]
    fn test_cancel_is_refused_while_submitting() {
        let mut workflow = ready();
        workflow.confirm(&pipeline(), &repos()).unwrap();
        assert_eq!(workflow.cancel(), Err(PromotionError::Busy));
        assert_eq!(
            workflow.select_event(event("e2", 2, EventType::Push, &["v2"])),
            Err(PromotionError::Busy)
        );
    }

    #[test]
    fn test_responses_after_cancel_are_ignored() {
        let (mut workflow, query) = shown();
        workflow.cancel().unwrap();

        assert!(!workflow.events_loaded(query.ticket, Ok(EventPage::default())));
        assert_eq!(workflow.refresh_events(), Err(PromotionError::Closed));
    }

    #[test]
    fn test_stale_promotion_outcome_is_ignored() {
        let mut workflow = ready();
        let command = workflow.confirm(&pipeline(), &repos()).unwrap();
        workflow.promotion_failed(command.ticket, "nope");

        assert_eq!(workflow.promotion_succeeded(command.ticket, pipeline()), None);
        assert!(!workflow.promotion_failed(command.ticket, "again"));
        assert_eq!(workflow.phase(), PromotionPhase::Ready);
    }
}
