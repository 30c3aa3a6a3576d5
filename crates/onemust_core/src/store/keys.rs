//! Stable storage key names.

use crate::model::card::OnboardingFlag;

/// Key with a stable persisted name.
pub trait StoreKey {
    fn storage_key(&self) -> String;
}

/// Keys in the main app's private store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalKey {
    Cards,
    ManualPriority,
    Exclusions,
    CompletedArchive,
    Onboarding(OnboardingFlag),
}

impl StoreKey for LocalKey {
    fn storage_key(&self) -> String {
        match self {
            Self::Cards => "local.cards".to_string(),
            Self::ManualPriority => "local.manual_priority".to_string(),
            Self::Exclusions => "local.exclusions".to_string(),
            Self::CompletedArchive => "local.completed_archive".to_string(),
            Self::Onboarding(flag) => format!("local.onboarding.{}", flag.as_str()),
        }
    }
}

/// Keys in the store shared with the widget extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SharedKey {
    CurrentCard,
    PriorityCards,
    AllCards,
    CompletedCards,
    CompletingCardId,
}

impl SharedKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CurrentCard => "shared.current_card",
            Self::PriorityCards => "shared.priority_cards",
            Self::AllCards => "shared.all_cards",
            Self::CompletedCards => "shared.completed_cards",
            Self::CompletingCardId => "shared.completing_card_id",
        }
    }
}

impl StoreKey for SharedKey {
    fn storage_key(&self) -> String {
        self.as_str().to_string()
    }
}
