//! Static label classification and technology detection
//!
//! Maps well-known GitHub label names onto an experience level or an issue
//! type. Matching is case-insensitive. Labels that match neither family leave
//! the classification untouched.
//!
//! [`detect_technologies`] scans free text for known frameworks and tools.

use crate::types::{ExperienceLevel, IssueType};

/// Category a single label maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelClass {
    Experience(ExperienceLevel),
    Type(IssueType),
}

/// Delimiters used to split compound labels such as `type: bug`
const LABEL_DELIMITERS: &[char] = &[' ', ':', '.', ','];

/// Look up one label name in the static tables
pub fn lookup(name: &str) -> Option<LabelClass> {
    match name.trim().to_lowercase().as_str() {
        "help_wanted" | "help wanted" | "good first issue" | "easyfix" | "easy" => {
            Some(LabelClass::Experience(ExperienceLevel::Easy))
        }
        "moderate" => Some(LabelClass::Experience(ExperienceLevel::Moderate)),
        "senior" => Some(LabelClass::Experience(ExperienceLevel::Senior)),
        "bug" | "bugfix" => Some(LabelClass::Type(IssueType::Bugfix)),
        "enhancement" => Some(LabelClass::Type(IssueType::Enhancement)),
        _ => None,
    }
}

/// Classify one label, falling back to its delimiter-separated fragments
///
/// Fragments are returned in label order, so the last fragment of a family wins.
pub fn classify_label(name: &str) -> Vec<LabelClass> {
    if let Some(class) = lookup(name) {
        return vec![class];
    }

    let fragments: Vec<&str> = name
        .split(LABEL_DELIMITERS)
        .filter(|f| !f.is_empty())
        .collect();
    if fragments.len() < 2 {
        return Vec::new();
    }

    fragments.into_iter().filter_map(lookup).collect()
}

/// Result of classifying an issue's whole label set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Classification {
    pub experience: Option<ExperienceLevel>,
    pub issue_type: Option<IssueType>,
}

impl Classification {
    fn apply(&mut self, class: LabelClass) {
        match class {
            LabelClass::Experience(level) => self.experience = Some(level),
            LabelClass::Type(kind) => self.issue_type = Some(kind),
        }
    }
}

/// Classify labels in the order given; within a family the last match wins
pub fn classify<'a>(labels: impl IntoIterator<Item = &'a str>) -> Classification {
    let mut result = Classification::default();
    for label in labels {
        for class in classify_label(label) {
            result.apply(class);
        }
    }
    result
}

/// Known technologies keyed by lower-cased phrase of up to three words
const TECHNOLOGIES: &[(&str, &str)] = &[
    ("react.js", "React"),
    ("reactjs", "React"),
    ("react", "React"),
    ("react native", "React Native"),
    ("node.js", "Node"),
    ("nodejs", "Node"),
    ("node", "Node"),
    ("vue.js", "Vue"),
    ("vuejs", "Vue"),
    ("vue", "Vue"),
    ("express.js", "Express"),
    ("expressjs", "Express"),
    ("express", "Express"),
    ("spring", "Spring"),
    ("angular.js", "Angular"),
    ("angularjs", "Angular"),
    ("angular", "Angular"),
    ("redux.js", "Redux"),
    ("reduxjs", "Redux"),
    ("redux", "Redux"),
    ("asp.net", "ASP.NET"),
    (".net", ".NET"),
    (".net core", ".NET Core"),
    ("django", "Django"),
    ("flask", "Flask"),
    ("laravel", "Laravel"),
    ("ruby on rails", "Rails"),
    ("rails", "Rails"),
    ("jquery", "jQuery"),
    ("drupal", "Drupal"),
    ("pandas", "pandas"),
    ("unity", "Unity"),
    ("unity 3d", "Unity"),
    ("tensorflow", "TensorFlow"),
    ("ansible", "Ansible"),
    ("cordova", "Apache Cordova"),
    ("apache cordova", "Apache Cordova"),
    ("xamarin", "Xamarin"),
    ("apache spark", "Apache Spark"),
    ("hadoop", "Apache Hadoop"),
    ("apache hadoop", "Apache Hadoop"),
    ("unreal engine", "Unreal Engine"),
    ("flutter", "Flutter"),
    ("pytorch", "PyTorch"),
    ("torch", "PyTorch"),
    ("puppet", "Puppet"),
    ("chef", "Chef"),
    ("cryengine", "CryEngine"),
];

/// Longest phrase in [`TECHNOLOGIES`], in words
const MAX_PHRASE_WORDS: usize = 3;

/// Canonical name for one lower-cased phrase
pub fn lookup_technology(phrase: &str) -> Option<&'static str> {
    TECHNOLOGIES
        .iter()
        .find(|(key, _)| *key == phrase)
        .map(|(_, name)| *name)
}

/// Punctuation that separates words besides whitespace
const WORD_DELIMITERS: &[char] = &[
    ':', ',', ';', '(', ')', '<', '>', '"', '`', '!', '?', '[', ']', '*',
];

/// Lower-cased words of `text`, keeping dots inside words such as `node.js`
fn words(text: &str) -> Vec<String> {
    text.split(|c: char| c.is_whitespace() || WORD_DELIMITERS.contains(&c))
        .map(|w| w.trim_end_matches('.').to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Technologies mentioned in `text`, deduplicated
///
/// Single words are matched first, then two- and three-word phrases, so
/// `react native` yields both `React` and `React Native`.
pub fn detect_technologies(text: &str) -> Vec<&'static str> {
    let words = words(text);
    let mut found = Vec::new();
    for n in 1..=MAX_PHRASE_WORDS {
        for window in words.windows(n) {
            if let Some(name) = lookup_technology(&window.join(" ")) {
                if !found.contains(&name) {
                    found.push(name);
                }
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_easy_labels() {
        for label in ["easyfix", "easy", "good first issue", "help_wanted", "Good First Issue"] {
            assert_eq!(
                lookup(label),
                Some(LabelClass::Experience(ExperienceLevel::Easy)),
                "{label}"
            );
        }
    }

    #[test]
    fn test_type_labels() {
        assert_eq!(lookup("bug"), Some(LabelClass::Type(IssueType::Bugfix)));
        assert_eq!(lookup("BugFix"), Some(LabelClass::Type(IssueType::Bugfix)));
        assert_eq!(
            lookup("enhancement"),
            Some(LabelClass::Type(IssueType::Enhancement))
        );
    }

    #[test]
    fn test_unknown_label_contributes_nothing() {
        assert_eq!(lookup("documentation"), None);
        assert!(classify_label("wontfix").is_empty());
        assert_eq!(classify(["question", "duplicate"]), Classification::default());
    }

    #[test]
    fn test_compound_label_falls_back_to_fragments() {
        assert_eq!(
            classify_label("type: bug"),
            vec![LabelClass::Type(IssueType::Bugfix)]
        );
        assert_eq!(
            classify_label("difficulty.senior"),
            vec![LabelClass::Experience(ExperienceLevel::Senior)]
        );
    }

    #[test]
    fn test_last_label_in_family_wins() {
        let result = classify(["bug", "enhancement", "senior", "easy"]);
        assert_eq!(result.issue_type, Some(IssueType::Enhancement));
        assert_eq!(result.experience, Some(ExperienceLevel::Easy));

        let reversed = classify(["enhancement", "bug"]);
        assert_eq!(reversed.issue_type, Some(IssueType::Bugfix));
    }

    #[test]
    fn test_families_are_independent() {
        let result = classify(["bug", "moderate"]);
        assert_eq!(result.issue_type, Some(IssueType::Bugfix));
        assert_eq!(result.experience, Some(ExperienceLevel::Moderate));
    }

    #[test]
    fn test_detects_single_words() {
        assert_eq!(
            detect_technologies("Migrate the Django admin to Flask"),
            vec!["Django", "Flask"]
        );
        assert_eq!(detect_technologies("Bump jQuery, then ReactJS."), vec!["jQuery", "React"]);
    }

    #[test]
    fn test_detects_multi_word_phrases() {
        assert_eq!(
            detect_technologies("Port the screen to React Native"),
            vec!["React", "React Native"]
        );
        assert_eq!(detect_technologies("A Ruby on Rails app"), vec!["Rails"]);
        assert_eq!(
            detect_technologies("Runs on Apache Spark (and Hadoop)"),
            vec!["Apache Hadoop", "Apache Spark"]
        );
    }

    #[test]
    fn test_dotted_names_survive_tokenizing() {
        assert_eq!(
            detect_technologies("Rewrite in node.js; drop ASP.NET"),
            vec!["Node", "ASP.NET"]
        );
        assert_eq!(detect_technologies(".NET Core support"), vec![".NET", ".NET Core"]);
    }

    #[test]
    fn test_no_technologies() {
        assert!(detect_technologies("").is_empty());
        assert!(detect_technologies("Fix typo in README").is_empty());
        assert_eq!(lookup_technology("Django"), None);
        assert_eq!(lookup_technology("django"), Some("Django"));
    }
}
