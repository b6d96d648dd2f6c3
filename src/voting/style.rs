use crate::models::VoteValue;
use lazy_static::lazy_static;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteStyle {
    pub css: &'static str,
    pub icon: &'static str,
}

lazy_static! {
    static ref VOTE_STYLES: HashMap<VoteValue, VoteStyle> = {
        let mut styles = HashMap::new();
        styles.insert(VoteValue::Yes, VoteStyle { css: "voted-yes", icon: "thumb_up" });
        styles.insert(VoteValue::No, VoteStyle { css: "voted-no", icon: "thumb_down" });
        styles.insert(VoteValue::Abstain, VoteStyle { css: "voted-abstain", icon: "trip_origin" });
        styles
    };
}

/// Display class and icon for a vote value.
pub fn vote_style(value: VoteValue) -> &'static VoteStyle {
    &VOTE_STYLES[&value]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_vote_value_has_a_style() {
        assert_eq!(vote_style(VoteValue::Yes), &VoteStyle { css: "voted-yes", icon: "thumb_up" });
        assert_eq!(vote_style(VoteValue::No).icon, "thumb_down");
        assert_eq!(vote_style(VoteValue::Abstain).css, "voted-abstain");
    }

    #[test]
    fn styles_are_distinct() {
        let classes: std::collections::HashSet<_> =
            VoteValue::ALL.iter().map(|&value| vote_style(value).css).collect();
        assert_eq!(classes.len(), VoteValue::ALL.len());
    }
}
