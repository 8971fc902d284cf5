//! DTD Entity Declarations
//!
//! Only entity declarations matter to a non-validating reader: element,
//! attribute-list and notation declarations are skipped. The store is filled
//! only when the caller explicitly allowed entities; otherwise the tokenizer
//! refuses any internal subset that declares one.

use super::scanner::{is_whitespace, Scanner};
use memchr::memmem;
use std::collections::{HashMap, HashSet};

/// A general entity declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDecl {
    /// Replacement text for internal entities
    pub value: Option<String>,
    /// System identifier for external entities (never fetched)
    pub system_id: Option<String>,
}

impl EntityDecl {
    /// Entities referenced in the replacement text
    fn references(&self) -> Vec<&str> {
        let Some(value) = &self.value else {
            return Vec::new();
        };
        let mut refs = Vec::new();
        let mut rest = value.as_str();
        while let Some(amp) = rest.find('&') {
            rest = &rest[amp + 1..];
            if rest.starts_with('#') {
                continue;
            }
            if let Some(semi) = rest.find(';') {
                refs.push(&rest[..semi]);
                rest = &rest[semi + 1..];
            }
        }
        refs
    }
}

/// General entities declared in a document's internal subset
#[derive(Debug, Default, Clone)]
pub struct EntityDeclarations {
    entities: HashMap<String, EntityDecl>,
}

impl EntityDeclarations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity declaration. First declaration wins (per XML spec)
    pub fn add_entity(&mut self, name: String, decl: EntityDecl) {
        self.entities.entry(name).or_insert(decl);
    }

    /// Look up a declared entity
    pub fn get(&self, name: &str) -> Option<&EntityDecl> {
        self.entities.get(name)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check for circular entity references
    pub fn check_recursion(&self) -> Result<(), String> {
        for name in self.entities.keys() {
            let mut visited = HashSet::new();
            let mut stack: Vec<&str> = vec![name.as_str()];

            while let Some(current) = stack.pop() {
                if !visited.insert(current) {
                    if current == name.as_str() {
                        return Err(format!(
                            "Recursive entity reference: '{}' references itself",
                            name
                        ));
                    }
                    continue;
                }
                if let Some(decl) = self.entities.get(current) {
                    stack.extend(decl.references());
                }
            }
        }
        Ok(())
    }
}

/// Whether an internal subset declares any entity at all
pub fn declares_entities(subset: &[u8]) -> bool {
    memmem::find(subset, b"<!ENTITY").is_some()
}

/// Parse the general entity declarations of an internal subset.
/// Parameter entities are recognized and skipped.
pub fn parse_internal_subset(subset: &str) -> Result<EntityDeclarations, String> {
    let mut declarations = EntityDeclarations::new();
    let bytes = subset.as_bytes();
    let mut pos = 0;

    while let Some(start) = memmem::find(&bytes[pos..], b"<!ENTITY") {
        let mut scanner = Scanner::at(bytes, pos + start + b"<!ENTITY".len());
        if scanner.skip_whitespace() == 0 {
            return Err(malformed());
        }

        let is_parameter = scanner.peek() == Some(b'%');
        if is_parameter {
            scanner.advance(1);
            scanner.skip_whitespace();
        }

        let name = scanner.read_name().ok_or_else(malformed)?;
        let name = std::str::from_utf8(name).map_err(|_| malformed())?;
        scanner.skip_whitespace();

        let decl = if scanner.starts_with(b"SYSTEM") || scanner.starts_with(b"PUBLIC") {
            let public = scanner.starts_with(b"PUBLIC");
            scanner.advance(6);
            scanner.skip_whitespace();
            if public {
                scanner.read_quoted().ok_or_else(malformed)?;
                scanner.skip_whitespace();
            }
            let system = scanner.read_quoted().ok_or_else(malformed)?;
            EntityDecl {
                value: None,
                system_id: Some(String::from_utf8_lossy(system).into_owned()),
            }
        } else {
            let value = scanner.read_quoted().ok_or_else(malformed)?;
            EntityDecl {
                value: Some(String::from_utf8_lossy(value).into_owned()),
                system_id: None,
            }
        };

        let end = scanner.find_byte(b'>').ok_or_else(malformed)?;
        if !bytes[scanner.position()..end].iter().all(|&b| is_whitespace(b) || b.is_ascii_alphanumeric()) {
            return Err(malformed());
        }
        if !is_parameter {
            tracing::debug!(entity = name, external = decl.value.is_none(), "entity declared");
            declarations.add_entity(name.to_string(), decl);
        }
        pos = end + 1;
    }

    declarations.check_recursion()?;
    Ok(declarations)
}

fn malformed() -> String {
    "Malformed entity declaration".to_string()
}
