use crate::session::Stage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Landing,
    Onboarding,
    Feed,
}

/// Where a visitor at `stage` asking for `page` must be sent instead, if anywhere.
///
/// Stages only move forward (`Anonymous -> NoHandle -> WithHandle`), and each
/// page admits exactly one stage.
pub fn redirect_for(stage: Stage, page: Page) -> Option<&'static str> {
    use Page::*;
    use Stage::*;
    match (stage, page) {
        (Anonymous, Landing) | (NoHandle, Onboarding) | (WithHandle, Feed) => None,
        (Anonymous, Onboarding | Feed) => Some("/"),
        (NoHandle, Landing | Feed) => Some("/onboarding"),
        (WithHandle, Landing | Onboarding) => Some("/feed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_page_admits_one_stage() {
        use Page::*;
        use Stage::*;
        for (stage, page) in [(Anonymous, Landing), (NoHandle, Onboarding), (WithHandle, Feed)] {
            assert_eq!(redirect_for(stage, page), None);
        }
        for stage in [Anonymous, NoHandle, WithHandle] {
            let open: Vec<Page> = [Landing, Onboarding, Feed].into_iter()
                .filter(|page| redirect_for(stage, *page).is_none())
                .collect();
            assert_eq!(open.len(), 1, "{stage:?}");
        }
    }

    #[test]
    fn redirects_point_at_the_admitting_page() {
        assert_eq!(redirect_for(Stage::Anonymous, Page::Feed), Some("/"));
        assert_eq!(redirect_for(Stage::Anonymous, Page::Onboarding), Some("/"));
        assert_eq!(redirect_for(Stage::NoHandle, Page::Feed), Some("/onboarding"));
        assert_eq!(redirect_for(Stage::WithHandle, Page::Onboarding), Some("/feed"));
        assert_eq!(redirect_for(Stage::WithHandle, Page::Landing), Some("/feed"));
    }
}
