//! Node type identity utilities
//!
//! A qualified node type name has the form `ns1.ns2::name::version`. The
//! namespace may span several `::` sections, which are joined with `.` when
//! read back. Names with fewer than [`MIN_COMPONENTS`] sections are invalid:
//! their "name" is the raw string and they have no namespace or version.
//!
//! These functions never fail. Callers handle the `None` cases.

use chrono::{DateTime, Utc};
use node_fs::NormalizedPath;

/// Minimum number of `::` sections for a valid qualified name.
pub const MIN_COMPONENTS: usize = 2;

/// Separator between qualified name sections.
pub const SEPARATOR: &str = "::";

/// Split a qualified name into its `::` sections.
pub fn components(qualified_name: &str) -> Vec<&str> {
    qualified_name.split(SEPARATOR).collect()
}

/// Whether the name has at least [`MIN_COMPONENTS`] sections.
pub fn is_valid(qualified_name: &str) -> bool {
    components(qualified_name).len() >= MIN_COMPONENTS
}

/// Namespace of a qualified name, or `new_namespace` when given.
///
/// All sections before the last two are joined with `.`; a valid two-section
/// name has the empty namespace.
pub fn namespace(qualified_name: &str, new_namespace: Option<&str>) -> Option<String> {
    if let Some(ns) = new_namespace {
        return Some(ns.to_string());
    }
    let parts = components(qualified_name);
    if parts.len() < MIN_COMPONENTS {
        return None;
    }
    Some(parts[..parts.len() - 2].join("."))
}

/// Name of a qualified name, or `new_name` when given.
///
/// Invalid names are returned unchanged.
pub fn name(qualified_name: &str, new_name: Option<&str>) -> String {
    if let Some(n) = new_name {
        return n.to_string();
    }
    let parts = components(qualified_name);
    if parts.len() < MIN_COMPONENTS {
        return qualified_name.to_string();
    }
    parts[parts.len() - 2].to_string()
}

/// Version of a qualified name, or `new_version` when given.
pub fn version(qualified_name: &str, new_version: Option<&str>) -> Option<String> {
    if let Some(v) = new_version {
        return Some(v.to_string());
    }
    let parts = components(qualified_name);
    if parts.len() < MIN_COMPONENTS {
        return None;
    }
    parts.last().map(|v| v.to_string())
}

/// Key grouping every version of a node type: `{namespace}::{category}/{name}`.
pub fn lookup_key(qualified_name: &str, category: &str) -> Option<String> {
    let mut parts = components(qualified_name);
    if parts.len() < MIN_COMPONENTS {
        return None;
    }
    let idx = parts.len() - 2;
    let scoped = format!("{}/{}", category, parts[idx]);
    parts[idx] = &scoped;
    Some(parts[..parts.len() - 1].join(SEPARATOR))
}

/// Lookup key, or the opaque `{category}/{name}` for invalid names.
pub fn registry_key(qualified_name: &str, category: &str) -> String {
    lookup_key(qualified_name, category)
        .unwrap_or_else(|| format!("{}/{}", category, qualified_name))
}

/// Build a qualified name from its parts.
///
/// Empty namespaces and missing versions are left out rather than producing
/// empty sections.
pub fn qualified_name(namespace: Option<&str>, name: &str, version: Option<&str>) -> String {
    let mut parts: Vec<&str> = Vec::with_capacity(3);
    if let Some(ns) = namespace.filter(|ns| !ns.is_empty()) {
        parts.push(ns);
    }
    parts.push(name);
    if let Some(v) = version {
        parts.push(v);
    }
    parts.join(SEPARATOR)
}

/// Qualified name with any of its components replaced.
pub fn rename(
    qualified_name: &str,
    new_namespace: Option<&str>,
    new_name: Option<&str>,
    new_version: Option<&str>,
) -> String {
    let ns = namespace(qualified_name, new_namespace);
    let n = name(qualified_name, new_name);
    let v = version(qualified_name, new_version);
    self::qualified_name(ns.as_deref(), &n, v.as_deref())
}

/// Directory name a definition is expanded into for source control.
///
/// `Sop` + `studio.tools::box::2.0` -> `Sop_studio.tools.box.2.0.hda`
pub fn expanded_name(category: &str, qualified_name: &str) -> String {
    let mut stem = String::new();
    if let Some(ns) = namespace(qualified_name, None).filter(|ns| !ns.is_empty()) {
        stem.push_str(&ns);
        stem.push('.');
    }
    stem.push_str(&name(qualified_name, None));
    if let Some(v) = version(qualified_name, None) {
        stem.push('.');
        stem.push_str(&v);
    }
    format!("{}_{}.hda", category, stem)
}

/// File name for an editable copy in the edit directory.
///
/// `timestamp` keeps repeated edits of the same type apart. Use
/// [`editable_path`] to also separate edits made within the same second.
pub fn editable_file_name(
    category: &str,
    qualified_name: &str,
    new_namespace: Option<&str>,
    new_name: Option<&str>,
    timestamp: i64,
) -> String {
    let full_name = if is_valid(qualified_name) {
        let ns = namespace(qualified_name, new_namespace).unwrap_or_default();
        format!("{}_{}", ns, name(qualified_name, new_name))
    } else {
        name(qualified_name, new_name)
    };
    format!("{}_{}.{}.hda", category, full_name, timestamp)
}

/// Path in `edit_dir` for a new editable copy that no existing file occupies.
///
/// A taken name gets a `_1`, `_2`, ... suffix after the timestamp.
pub fn editable_path(
    edit_dir: &NormalizedPath,
    category: &str,
    qualified_name: &str,
    new_namespace: Option<&str>,
    new_name: Option<&str>,
    timestamp: i64,
) -> NormalizedPath {
    let file_name = editable_file_name(category, qualified_name, new_namespace, new_name, timestamp);
    let stem = file_name.strip_suffix(".hda").unwrap_or(&file_name);
    let mut path = edit_dir.join(&file_name);
    let mut counter = 1;
    while path.exists() {
        path = edit_dir.join(&format!("{}_{}.hda", stem, counter));
        counter += 1;
    }
    path
}

/// Git branch a release of this definition is prepared on.
pub fn release_branch_name(category: &str, qualified_name: &str, now: DateTime<Utc>) -> String {
    let ns = namespace(qualified_name, None)
        .filter(|ns| !ns.is_empty())
        .map(|ns| format!("{}-", ns))
        .unwrap_or_default();
    let raw = format!(
        "release_{}-{}{}-{}-{}",
        category,
        ns,
        name(qualified_name, None),
        version(qualified_name, None).unwrap_or_else(|| "none".to_string()),
        now.format("%d-%m-%y-%H-%M-%S"),
    );
    node_git::naming::sanitize_branch_name(&raw)
}

/// Parsed identity of a definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeIdentity {
    pub namespace: Option<String>,
    pub name: String,
    pub version: Option<String>,
    pub category: String,
}

impl NodeIdentity {
    pub fn parse(qualified_name: &str, category: &str) -> Self {
        Self {
            namespace: namespace(qualified_name, None),
            name: name(qualified_name, None),
            version: version(qualified_name, None),
            category: category.to_string(),
        }
    }

    pub fn qualified_name(&self) -> String {
        qualified_name(self.namespace.as_deref(), &self.name, self.version.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("studio::box::1.0", Some("studio"), "box", Some("1.0"))]
    #[case("studio::tools::box::2.1.3", Some("studio.tools"), "box", Some("2.1.3"))]
    #[case("box::1.0", Some(""), "box", Some("1.0"))]
    #[case("box", None, "box", None)]
    fn test_components(
        #[case] qualified: &str,
        #[case] ns: Option<&str>,
        #[case] n: &str,
        #[case] v: Option<&str>,
    ) {
        assert_eq!(namespace(qualified, None).as_deref(), ns);
        assert_eq!(name(qualified, None), n);
        assert_eq!(version(qualified, None).as_deref(), v);
    }

    #[test]
    fn test_overrides_win_even_for_invalid_names() {
        assert_eq!(namespace("box", Some("studio")).as_deref(), Some("studio"));
        assert_eq!(name("box", Some("sphere")), "sphere");
        assert_eq!(version("box", Some("2.0")).as_deref(), Some("2.0"));
    }

    #[test]
    fn test_round_trip_reconstructs_name() {
        let qualified = "studio::box::1.0";
        let rebuilt = format!(
            "{}::{}::{}",
            namespace(qualified, None).unwrap(),
            name(qualified, None),
            version(qualified, None).unwrap()
        );
        assert_eq!(rebuilt, qualified);
    }

    #[test]
    fn test_minimum_component_count() {
        assert!(is_valid("box::1.0"));
        assert!(is_valid("studio::box::1.0"));
        assert!(!is_valid("box"));
        assert!(!is_valid(""));
    }

    #[rstest]
    #[case("studio::box::1.0", "Sop", Some("studio::Sop/box"))]
    #[case("studio::tools::box::1.0", "Object", Some("studio::tools::Object/box"))]
    #[case("box::1.0", "Sop", Some("Sop/box"))]
    #[case("box", "Sop", None)]
    fn test_lookup_key(#[case] qualified: &str, #[case] category: &str, #[case] expected: Option<&str>) {
        assert_eq!(lookup_key(qualified, category).as_deref(), expected);
    }

    #[test]
    fn test_lookup_key_ignores_version_and_separates_categories() {
        assert_eq!(
            lookup_key("studio::box::1.0", "Sop"),
            lookup_key("studio::box::2.0", "Sop")
        );
        assert_ne!(
            lookup_key("studio::box::1.0", "Sop"),
            lookup_key("studio::box::1.0", "Object")
        );
    }

    #[test]
    fn test_registry_key_falls_back_for_invalid_names() {
        assert_eq!(registry_key("studio::box::1.0", "Sop"), "studio::Sop/box");
        assert_eq!(registry_key("box", "Sop"), "Sop/box");
    }

    #[test]
    fn test_identity_parse() {
        let identity = NodeIdentity::parse("studio.tools::box::1.0", "Sop");
        assert_eq!(identity.namespace.as_deref(), Some("studio.tools"));
        assert_eq!(identity.name, "box");
        assert_eq!(identity.version.as_deref(), Some("1.0"));
        assert_eq!(identity.qualified_name(), "studio.tools::box::1.0");
    }

    #[rstest]
    #[case("studio::box::1.0", None, None, Some("2.0"), "studio::box::2.0")]
    #[case("studio::box::1.0", Some("lab"), Some("cube"), None, "lab::cube::1.0")]
    #[case("box::1.0", None, None, Some("1.1"), "box::1.1")]
    fn test_rename(
        #[case] qualified: &str,
        #[case] ns: Option<&str>,
        #[case] n: Option<&str>,
        #[case] v: Option<&str>,
        #[case] expected: &str,
    ) {
        assert_eq!(rename(qualified, ns, n, v), expected);
    }

    #[rstest]
    #[case("Sop", "studio.tools::box::2.0", "Sop_studio.tools.box.2.0.hda")]
    #[case("Sop", "studio::tools::box::2.0", "Sop_studio.tools.box.2.0.hda")]
    #[case("Object", "box::1", "Object_box.1.hda")]
    fn test_expanded_name(#[case] category: &str, #[case] qualified: &str, #[case] expected: &str) {
        assert_eq!(expanded_name(category, qualified), expected);
    }

    #[test]
    fn test_editable_file_name() {
        assert_eq!(
            editable_file_name("Sop", "studio::box::1.0", None, None, 1700000000),
            "Sop_studio_box.1700000000.hda"
        );
        assert_eq!(
            editable_file_name("Sop", "studio::box::1.0", Some("lab"), Some("cube"), 5),
            "Sop_lab_cube.5.hda"
        );
        assert_eq!(editable_file_name("Sop", "box", None, None, 5), "Sop_box.5.hda");
    }

    #[test]
    fn test_editable_path_skips_taken_names() {
        let temp = tempfile::TempDir::new().unwrap();
        let dir = NormalizedPath::new(temp.path());

        let first = editable_path(&dir, "Sop", "studio::box::1.0", None, None, 5);
        assert_eq!(first, dir.join("Sop_studio_box.5.hda"));
        std::fs::write(first.to_native(), "{}").unwrap();

        let second = editable_path(&dir, "Sop", "studio::box::1.0", None, None, 5);
        assert_eq!(second, dir.join("Sop_studio_box.5_1.hda"));
        std::fs::write(second.to_native(), "{}").unwrap();

        let third = editable_path(&dir, "Sop", "studio::box::1.0", None, None, 5);
        assert_eq!(third, dir.join("Sop_studio_box.5_2.hda"));
    }

    #[test]
    fn test_release_branch_name() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            release_branch_name("Sop", "studio::box::2.0", now),
            "release_Sop-studio-box-2.0-09-03-24-14-05-07"
        );
        assert_eq!(
            release_branch_name("Sop", "box::2.0", now),
            "release_Sop-box-2.0-09-03-24-14-05-07"
        );
    }
}
