use crate::core::catalog;
use crate::core::repository::{AvailabilityRepository, LoadOutcome};
use crate::domain::model::{AvailabilityRecord, AvailabilityStatus, Chauffeur, Event};
use crate::domain::ports::RecordStore;
use crate::utils::error::{AvailabilityError, Result};

/// One event as shown to the selected chauffeur.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRow {
    pub event: Event,
    pub status: AvailabilityStatus,
}

/// Selection state behind the sign-up form: who is selected, which events
/// exist, and the banner shown after a failed operation.
pub struct AvailabilityViewModel<S: RecordStore> {
    repository: AvailabilityRepository<S>,
    chauffeurs: Vec<Chauffeur>,
    events: Option<Vec<Event>>,
    selected: Option<String>,
    banner: Option<String>,
}

impl<S: RecordStore> AvailabilityViewModel<S> {
    pub fn new(store: S) -> Self {
        Self {
            repository: AvailabilityRepository::new(store),
            chauffeurs: Vec::new(),
            events: None,
            selected: None,
            banner: None,
        }
    }

    pub fn repository(&self) -> &AvailabilityRepository<S> {
        &self.repository
    }

    pub async fn load_chauffeurs(&mut self) -> Result<&[Chauffeur]> {
        let fetched = catalog::fetch_chauffeurs(self.repository.store()).await;
        match fetched {
            Ok(chauffeurs) => {
                self.chauffeurs = chauffeurs;
                Ok(&self.chauffeurs)
            }
            Err(e) => Err(self.report(e)),
        }
    }

    /// Selects a chauffeur. Events are fetched on first selection only; the
    /// availability cache is replaced on every selection. An empty id clears
    /// the selection.
    pub async fn select_chauffeur(&mut self, chauffeur_id: &str) -> Result<()> {
        if chauffeur_id.is_empty() {
            self.clear_selection();
            return Ok(());
        }

        tracing::debug!("Selecting chauffeur {}", chauffeur_id);
        self.selected = Some(chauffeur_id.to_string());
        self.banner = None;

        let mut first_error = None;
        if self.events.is_none() {
            let fetched = catalog::fetch_events(self.repository.store()).await;
            match fetched {
                Ok(events) => self.events = Some(events),
                Err(e) => first_error = Some(self.report(e)),
            }
        }

        let loaded = self.repository.load_for_chauffeur(chauffeur_id).await;
        match loaded {
            Ok(LoadOutcome::Applied(records)) => {
                tracing::info!(
                    "Loaded {} availability records for chauffeur {}",
                    records.len(),
                    chauffeur_id
                );
            }
            Ok(LoadOutcome::Stale) => {}
            Err(e) => {
                let e = self.report(e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
        self.repository.clear();
    }

    pub fn chauffeurs(&self) -> &[Chauffeur] {
        &self.chauffeurs
    }

    pub fn events(&self) -> &[Event] {
        self.events.as_deref().unwrap_or_default()
    }

    pub fn selected_chauffeur(&self) -> Option<&Chauffeur> {
        let id = self.selected.as_deref()?;
        self.chauffeurs.iter().find(|c| c.id == id)
    }

    pub fn selected_chauffeur_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Status shown for an event; `Unset` without a selection.
    pub fn status_for(&self, event_id: &str) -> AvailabilityStatus {
        match &self.selected {
            Some(chauffeur_id) => self.repository.status_for(event_id, chauffeur_id),
            None => AvailabilityStatus::Unset,
        }
    }

    pub fn rows(&self) -> Vec<EventRow> {
        if self.selected.is_none() {
            return Vec::new();
        }
        self.events()
            .iter()
            .map(|event| EventRow {
                status: self.status_for(&event.id),
                event: event.clone(),
            })
            .collect()
    }

    /// Applies a status change for the selected chauffeur. On failure the
    /// banner is set and the shown status stays at its previous value.
    pub async fn request_change(
        &mut self,
        event_id: &str,
        status: AvailabilityStatus,
    ) -> Result<AvailabilityRecord> {
        let Some(chauffeur_id) = self.selected.clone() else {
            return Err(self.report(AvailabilityError::NoChauffeurSelected));
        };

        let written = self.repository.upsert(event_id, &chauffeur_id, status).await;
        match written {
            Ok(record) => {
                self.banner = None;
                Ok(record)
            }
            Err(e) => Err(self.report(e)),
        }
    }

    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn dismiss_banner(&mut self) {
        self.banner = None;
    }

    fn report(&mut self, error: AvailabilityError) -> AvailabilityError {
        tracing::error!("{}", error);
        self.banner = Some(error.user_friendly_message());
        error
    }
}
