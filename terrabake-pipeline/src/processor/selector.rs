use terrabake_core::{BakeResult, Host, ObjectId};

/// Which objects belong to the working set, judged by name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NamePredicate {
    Prefix(String),
    AnyPrefix(Vec<String>),
}

impl Default for NamePredicate {
    fn default() -> Self {
        NamePredicate::Prefix("ground".to_string())
    }
}

impl NamePredicate {
    pub fn from_prefixes(mut prefixes: Vec<String>) -> Self {
        match prefixes.len() {
            1 => NamePredicate::Prefix(prefixes.remove(0)),
            _ => NamePredicate::AnyPrefix(prefixes),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            NamePredicate::Prefix(prefix) => name.starts_with(prefix.as_str()),
            NamePredicate::AnyPrefix(prefixes) => prefixes.iter().any(|p| name.starts_with(p.as_str())),
        }
    }
}

/// Matching objects in host scene order.
pub fn select<H: Host + ?Sized>(host: &H, predicate: &NamePredicate) -> BakeResult<Vec<ObjectId>> {
    let mut selected = Vec::new();
    for object in host.objects() {
        if predicate.matches(&host.object(object)?.name) {
            selected.push(object);
        }
    }
    Ok(selected)
}
