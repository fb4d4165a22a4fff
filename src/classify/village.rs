use crate::classify::rules::ClassificationRuleSet;

impl ClassificationRuleSet {
    /// Maps a complex name to its village label.
    ///
    /// Overrides are checked first, then the keyword table in order, then
    /// secondary patterns. The first substring hit wins; anything else gets
    /// the fallback label.
    pub fn classify_village(&self, name: &str) -> &str {
        let name = name.trim();
        if name.is_empty() {
            return self.fallback_label();
        }

        if let Some(rule) = self.overrides().iter().find(|r| name.contains(r.contains.as_str())) {
            return rule.label.as_deref().unwrap_or(self.fallback_label());
        }

        self.villages()
            .iter()
            .chain(self.patterns())
            .find(|rule| name.contains(rule.keyword.as_str()))
            .map(|rule| rule.label.as_str())
            .unwrap_or(self.fallback_label())
    }
}
