//! Namespace Resolution
//!
//! Stack-based namespace resolver producing Clark notation (`{uri}local`)
//! names for elements and attributes.

use super::attributes::split_name;

/// Well-known namespace URIs
pub mod ns {
    pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
    pub const XMLNS: &str = "http://www.w3.org/2000/xmlns/";
}

/// Namespace binding (prefix -> URI). The default namespace has an empty prefix
#[derive(Debug, Clone)]
struct NsBinding {
    prefix: String,
    uri: String,
    depth: usize,
}

/// Stack-based namespace resolver
#[derive(Debug)]
pub struct NamespaceResolver {
    /// Stack of namespace bindings
    bindings: Vec<NsBinding>,
    /// Current element depth
    depth: usize,
}

impl Default for NamespaceResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl NamespaceResolver {
    /// Create a new namespace resolver with pre-declared xml and xmlns namespaces
    pub fn new() -> Self {
        NamespaceResolver {
            bindings: vec![
                NsBinding {
                    prefix: "xml".to_string(),
                    uri: ns::XML.to_string(),
                    depth: 0,
                },
                NsBinding {
                    prefix: "xmlns".to_string(),
                    uri: ns::XMLNS.to_string(),
                    depth: 0,
                },
            ],
            depth: 0,
        }
    }

    /// Enter a new element scope
    pub fn push_scope(&mut self) {
        self.depth += 1;
    }

    /// Leave an element scope, removing any bindings declared in it
    pub fn pop_scope(&mut self) {
        while let Some(binding) = self.bindings.last() {
            if binding.depth < self.depth {
                break;
            }
            self.bindings.pop();
        }
        self.depth = self.depth.saturating_sub(1);
    }

    /// Declare a namespace binding for the current scope
    pub fn declare(&mut self, prefix: &str, uri: &str) {
        // Don't allow redeclaring xml or xmlns
        if prefix == "xml" || prefix == "xmlns" {
            return;
        }

        self.bindings.push(NsBinding {
            prefix: prefix.to_string(),
            uri: uri.to_string(),
            depth: self.depth,
        });
    }

    /// Declare the default namespace for current scope; an empty URI undeclares it
    pub fn declare_default(&mut self, uri: &str) {
        self.declare("", uri);
    }

    /// Resolve a prefix to a namespace URI
    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        // Search from most recent to oldest
        self.bindings
            .iter()
            .rev()
            .find(|b| b.prefix == prefix)
            .map(|b| b.uri.as_str())
    }

    /// Resolve the default namespace
    pub fn resolve_default(&self) -> Option<&str> {
        self.resolve("").filter(|uri| !uri.is_empty())
    }

    /// Qualify an element name: prefixed names use their binding, unprefixed
    /// names use the default namespace. Returns `Err(prefix)` when unbound.
    pub fn qualify_element<'a>(&self, qname: &'a str) -> Result<String, &'a str> {
        match split_str(qname) {
            (Some(prefix), local) => {
                let uri = self.resolve(prefix).filter(|uri| !uri.is_empty()).ok_or(prefix)?;
                Ok(clark(uri, local))
            }
            (None, local) => Ok(match self.resolve_default() {
                Some(uri) => clark(uri, local),
                None => local.to_string(),
            }),
        }
    }

    /// Qualify an attribute name: unprefixed attributes are never namespaced
    pub fn qualify_attribute<'a>(&self, qname: &'a str) -> Result<String, &'a str> {
        match split_str(qname) {
            (Some(prefix), local) => {
                let uri = self.resolve(prefix).filter(|uri| !uri.is_empty()).ok_or(prefix)?;
                Ok(clark(uri, local))
            }
            (None, local) => Ok(local.to_string()),
        }
    }
}

fn split_str(qname: &str) -> (Option<&str>, &str) {
    match split_name(qname.as_bytes()) {
        (Some(prefix), _) => (Some(&qname[..prefix.len()]), &qname[prefix.len() + 1..]),
        (None, _) => (None, qname),
    }
}

/// `{uri}local`
fn clark(uri: &str, local: &str) -> String {
    format!("{{{}}}{}", uri, local)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_namespaces() {
        let resolver = NamespaceResolver::new();
        assert_eq!(resolver.resolve("xml"), Some(ns::XML));
        assert_eq!(
            resolver.qualify_attribute("xml:lang").unwrap(),
            format!("{{{}}}lang", ns::XML)
        );
    }

    #[test]
    fn test_declare_and_resolve() {
        let mut resolver = NamespaceResolver::new();
        resolver.push_scope();
        resolver.declare("svg", "http://www.w3.org/2000/svg");
        assert_eq!(resolver.resolve("svg"), Some("http://www.w3.org/2000/svg"));
        assert_eq!(
            resolver.qualify_element("svg:rect").unwrap(),
            "{http://www.w3.org/2000/svg}rect"
        );
    }

    #[test]
    fn test_scope_pop() {
        let mut resolver = NamespaceResolver::new();
        resolver.push_scope();
        resolver.declare("foo", "http://example.com/foo");
        assert_eq!(resolver.resolve("foo"), Some("http://example.com/foo"));

        resolver.pop_scope();
        assert_eq!(resolver.resolve("foo"), None);
    }

    #[test]
    fn test_shadow_binding() {
        let mut resolver = NamespaceResolver::new();
        resolver.push_scope();
        resolver.declare("ns", "http://example.com/ns1");

        resolver.push_scope();
        resolver.declare("ns", "http://example.com/ns2");
        assert_eq!(resolver.resolve("ns"), Some("http://example.com/ns2"));

        resolver.pop_scope();
        assert_eq!(resolver.resolve("ns"), Some("http://example.com/ns1"));
    }

    #[test]
    fn test_default_namespace() {
        let mut resolver = NamespaceResolver::new();
        resolver.push_scope();
        resolver.declare_default("urn:a");
        assert_eq!(resolver.qualify_element("root").unwrap(), "{urn:a}root");
        assert_eq!(resolver.qualify_attribute("id").unwrap(), "id");

        resolver.push_scope();
        resolver.declare_default("");
        assert_eq!(resolver.qualify_element("inner").unwrap(), "inner");
    }

    #[test]
    fn test_unbound_prefix() {
        let resolver = NamespaceResolver::new();
        assert_eq!(resolver.qualify_element("nope:tag"), Err("nope"));
        assert_eq!(resolver.qualify_attribute("nope:attr"), Err("nope"));
    }
}
