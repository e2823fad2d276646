use regex::Regex;

use super::RawConstruct;

/// A user-defined category, with its compiled matching predicates.
///
/// Categories are plain data evaluated in configuration order; a category matches a construct when any of its
/// configured predicates does, and one with no predicates configured never matches.
#[derive(Debug, Clone)]
pub struct Category {
    pub name: String,
    pub description: String,
    pub name_regex: Option<Regex>,
    pub code_regex: Option<Regex>,
    pub comment_regex: Option<Regex>,
    pub path_regex: Option<Regex>,
}

impl Category {
    /// Whether any of the configured predicates matches the given construct
    fn matches(&self, construct: &RawConstruct, description: Option<&str>) -> bool {
        let checks: [(&Option<Regex>, Option<&str>); 4] = [
            (&self.code_regex, Some(&construct.code)),
            (&self.comment_regex, description),
            (&self.name_regex, Some(&construct.name)),
            (&self.path_regex, Some(&construct.source_path)),
        ];
        checks
            .into_iter()
            .any(|(regex, text)| match (regex, text) {
                (Some(regex), Some(text)) => regex.is_match(text),
                _ => false,
            })
    }
}

/// The ordered set of categories to classify constructs with
#[derive(Debug, Clone)]
pub struct CategorySet {
    categories: Vec<Category>,
    uncategorized_name: String,
}

impl CategorySet {
    pub fn new(categories: Vec<Category>, uncategorized_name: impl Into<String>) -> Self {
        Self {
            categories,
            uncategorized_name: uncategorized_name.into(),
        }
    }

    /// The name given to commands matching no category
    pub fn uncategorized_name(&self) -> &str {
        &self.uncategorized_name
    }

    /// Classifies a construct into the first matching category, in configuration order.
    ///
    /// Pure function of the construct, its resolved description and the configured categories.
    pub fn classify(&self, construct: &RawConstruct, description: Option<&str>) -> &str {
        self.categories
            .iter()
            .find(|category| category.matches(construct, description))
            .map(|category| category.name.as_str())
            .unwrap_or(&self.uncategorized_name)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::CommandKind;

    fn category(name: &str, name_regex: Option<&str>, code_regex: Option<&str>) -> Category {
        Category {
            name: name.into(),
            description: String::new(),
            name_regex: name_regex.map(|r| Regex::new(r).unwrap()),
            code_regex: code_regex.map(|r| Regex::new(r).unwrap()),
            comment_regex: None,
            path_regex: None,
        }
    }

    fn construct(name: &str, code: &str) -> RawConstruct {
        RawConstruct {
            kind: CommandKind::Function,
            name: name.into(),
            code: code.into(),
            source_path: "/home/user/.functions".into(),
            line_number: 1,
            comment_above: None,
            comment_inline: None,
        }
    }

    #[test]
    fn test_classify_first_match_wins() {
        // Declaration order wins over specificity: both categories match but A is declared first
        let set = CategorySet::new(
            vec![
                category("A", Some("^get_"), None),
                category("B", None, Some(".*curl.*")),
            ],
            "uncategorized",
        );
        let c = construct("get_weather", "curl wttr.in");
        assert_eq!(set.classify(&c, None), "A");
    }

    #[test]
    fn test_classify_falls_through_to_uncategorized() {
        let set = CategorySet::new(vec![category("A", Some("^get_"), None)], "misc");
        let c = construct("deploy", "./deploy.sh");
        assert_eq!(set.classify(&c, None), "misc");
    }

    #[test]
    fn test_classify_empty_predicates_never_match() {
        let set = CategorySet::new(vec![category("A", None, None)], "uncategorized");
        let c = construct("anything", "any code");
        assert_eq!(set.classify(&c, None), "uncategorized");
    }

    #[test]
    fn test_classify_comment_predicate_needs_description() {
        let mut cat = category("docs", None, None);
        cat.comment_regex = Some(Regex::new("weather").unwrap());
        let set = CategorySet::new(vec![cat], "uncategorized");
        let c = construct("get_weather", "curl wttr.in");

        assert_eq!(set.classify(&c, None), "uncategorized");
        assert_eq!(set.classify(&c, Some("Check the weather")), "docs");
    }

    #[test]
    fn test_classify_no_categories() {
        let set = CategorySet::new(Vec::new(), "uncategorized");
        let c = construct("ll", "ls -la");
        assert_eq!(set.classify(&c, None), "uncategorized");
    }
}
