use tracing::{info, instrument, warn};

use crate::cache::{Mutation, MutationKind};
use crate::error::ApiError;
use crate::flows::FlowError;
use crate::images::services::ImageSource;
use crate::meals::dto::FoodAnalysis;
use crate::meals::services as meals_api;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddMealState {
    Idle,
    ImageSelected,
    Analyzing,
    PreviewShown,
    Accepting,
    Declining,
}

impl AddMealState {
    fn name(self) -> &'static str {
        match self {
            AddMealState::Idle => "idle",
            AddMealState::ImageSelected => "image selected",
            AddMealState::Analyzing => "analyzing",
            AddMealState::PreviewShown => "preview shown",
            AddMealState::Accepting => "accepting",
            AddMealState::Declining => "declining",
        }
    }
}

/// Photo -> analysis -> accept/decline. At most one draft is held, and
/// only while the preview is shown.
#[derive(Debug, Clone)]
pub struct AddMealFlow {
    state: AddMealState,
    image: Option<ImageSource>,
    pub food_name: String,
    pub description: String,
    draft: Option<FoodAnalysis>,
    error: Option<String>,
    analyze: Mutation,
    save: Mutation,
    discard: Mutation,
}

impl Default for AddMealFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl AddMealFlow {
    pub fn new() -> Self {
        Self {
            state: AddMealState::Idle,
            image: None,
            food_name: String::new(),
            description: String::new(),
            draft: None,
            error: None,
            analyze: Mutation::new(MutationKind::AnalyzeFood),
            save: Mutation::new(MutationKind::SaveFood),
            discard: Mutation::new(MutationKind::DiscardFood),
        }
    }

    pub fn state(&self) -> AddMealState {
        self.state
    }

    pub fn image(&self) -> Option<&ImageSource> {
        self.image.as_ref()
    }

    pub fn draft(&self) -> Option<&FoodAnalysis> {
        self.draft.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn reject(&self, action: &'static str) -> FlowError {
        FlowError::InvalidTransition {
            state: self.state.name(),
            action,
        }
    }

    pub fn select_image(&mut self, source: ImageSource) -> Result<(), FlowError> {
        match self.state {
            AddMealState::Idle | AddMealState::ImageSelected => {
                self.image = Some(source);
                self.error = None;
                self.state = AddMealState::ImageSelected;
                Ok(())
            }
            _ => Err(self.reject("select an image")),
        }
    }

    pub fn clear_image(&mut self) -> Result<(), FlowError> {
        match self.state {
            AddMealState::Idle | AddMealState::ImageSelected => {
                self.image = None;
                self.state = AddMealState::Idle;
                Ok(())
            }
            _ => Err(self.reject("clear the image")),
        }
    }

    /// Uploads the selected photo. On failure the photo stays selected so
    /// the user can retry.
    #[instrument(skip(self, app))]
    pub async fn analyze(&mut self, app: &AppState) -> Result<FoodAnalysis, FlowError> {
        let image = match (self.state, self.image.clone()) {
            (AddMealState::ImageSelected, Some(image)) => image,
            (AddMealState::Idle, _) | (AddMealState::ImageSelected, None) => {
                let e = ApiError::validation("Please select an image");
                self.error = Some(e.to_string());
                return Err(e.into());
            }
            _ => return Err(self.reject("analyze")),
        };

        self.error = None;
        self.state = AddMealState::Analyzing;
        let timeout = app.config.analyze_timeout();
        match self
            .analyze
            .run(&app.cache, meals_api::analyze(&app.api, &image, timeout))
            .await
        {
            Ok(draft) => {
                self.draft = Some(draft.clone());
                self.state = AddMealState::PreviewShown;
                Ok(draft)
            }
            Err(e) => {
                self.error = Some(e.to_string());
                self.state = AddMealState::ImageSelected;
                Err(e.into())
            }
        }
    }

    /// Saves the draft as a diary entry and returns the confirmation text.
    #[instrument(skip(self, app))]
    pub async fn accept(&mut self, app: &AppState) -> Result<String, FlowError> {
        let draft = match (self.state, &self.draft) {
            (AddMealState::PreviewShown, Some(draft)) => draft.clone(),
            _ => return Err(self.reject("accept")),
        };

        self.error = None;
        self.state = AddMealState::Accepting;
        match self
            .save
            .run(&app.cache, meals_api::save(&app.api, &draft))
            .await
        {
            Ok(()) => {
                info!(storage_key = %draft.storage_key, "draft saved");
                self.reset();
                Ok(format!("{} added to your diary", draft.food_name))
            }
            Err(e) => {
                self.error = Some(e.to_string());
                self.state = AddMealState::PreviewShown;
                Err(e.into())
            }
        }
    }

    /// Discards the draft. Local state is cleared whatever the server says.
    #[instrument(skip(self, app))]
    pub async fn decline(&mut self, app: &AppState) -> Result<(), FlowError> {
        let storage_key = match (self.state, &self.draft) {
            (AddMealState::PreviewShown, Some(draft)) => draft.storage_key.clone(),
            _ => return Err(self.reject("decline")),
        };

        self.state = AddMealState::Declining;
        if let Err(e) = self
            .discard
            .run(&app.cache, meals_api::discard(&app.api, &storage_key))
            .await
        {
            warn!(storage_key = %storage_key, error = %e, "discarding draft failed");
        }
        self.reset();
        Ok(())
    }

    fn reset(&mut self) {
        self.state = AddMealState::Idle;
        self.image = None;
        self.food_name.clear();
        self.description.clear();
        self.draft = None;
        self.error = None;
        self.analyze.reset();
        self.save.reset();
        self.discard.reset();
    }
}
