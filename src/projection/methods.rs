//! Computation method resolution
//!
//! Finds the provider method that computes a field. Providers are tried in
//! order; within a provider, overloads sharing the expected name are tried in
//! declaration order and the first full match wins. A provider that declares
//! the name but no compatible overload ends the search with the first
//! overload's failure.

use thiserror::Error;
use tracing::{debug, warn};

use crate::compatibility::CompatibilityChecker;
use crate::declared::{CandidateMethod, MethodIntrospector};
use crate::diagnostics::{DiagnosticCode, DiagnosticItem, Diagnostics};
use crate::projection::metadata::MethodRef;
use crate::types::TypeRef;

/// One parameter the method must accept, from a resolved dependency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedParameter {
    pub type_ref: TypeRef,
    /// Final segment of the dependency path
    pub name: String,
}

/// The method a computed field needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodQuery {
    pub name: String,
    pub return_type: TypeRef,
    pub parameters: Vec<ExpectedParameter>,
}

impl MethodQuery {
    /// `public RET name(T1 a, T2 b);`
    pub fn expected_signature(&self) -> String {
        let params: Vec<String> = self
            .parameters
            .iter()
            .map(|p| format!("{} {}", p.type_ref, p.name))
            .collect();
        format!("public {} {}({});", self.return_type, self.name, params.join(", "))
    }
}

/// Why no method was bound
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MethodFailure {
    #[error("No matching provider found for computed method '{method}'")]
    NoMatch { method: String },

    #[error("Method {owner}.{method} has incompatible return type. Required: {required}, Found: {found}.")]
    ReturnType {
        owner: String,
        method: String,
        required: TypeRef,
        found: TypeRef,
    },

    #[error("Method {owner}.{method} has incompatible parameters count. Required: {required}, Found: {found}.")]
    ParameterCount {
        owner: String,
        method: String,
        required: usize,
        found: usize,
    },

    #[error("Method {owner}.{method} has incompatible type on parameter[{position}]. Required: {required}, Found: {found}.")]
    ParameterType {
        owner: String,
        method: String,
        position: usize,
        required: TypeRef,
        found: TypeRef,
    },
}

impl MethodFailure {
    pub fn code(&self) -> DiagnosticCode {
        match self {
            Self::NoMatch { .. } => DiagnosticCode::NoMatchingComputationMethod,
            Self::ReturnType { .. } => DiagnosticCode::IncompatibleReturnType,
            Self::ParameterCount { .. } => DiagnosticCode::IncompatibleParameterCount,
            Self::ParameterType { .. } => DiagnosticCode::IncompatibleParameterType,
        }
    }
}

/// Method lookup over an introspector
pub struct MethodResolver<'a> {
    introspector: &'a dyn MethodIntrospector,
    checker: CompatibilityChecker,
}

impl<'a> MethodResolver<'a> {
    pub fn new(introspector: &'a dyn MethodIntrospector, checker: CompatibilityChecker) -> Self {
        Self { introspector, checker }
    }

    /// Search `providers` in order. Providers the introspector does not know
    /// are skipped with a warning attached to `subject`.
    pub fn resolve(
        &self,
        subject: &str,
        element: &str,
        query: &MethodQuery,
        providers: &[String],
        warnings: &mut Diagnostics,
    ) -> Result<MethodRef, MethodFailure> {
        for provider in providers {
            let Some(methods) = self.introspector.declared_methods(provider) else {
                warn!(projection = %subject, provider = %provider, "provider type is not known");
                warnings.push(
                    DiagnosticItem::new(
                        subject,
                        DiagnosticCode::UnknownProvider,
                        format!("Provider {} declares no introspectable methods", provider),
                    )
                    .on(element),
                );
                continue;
            };

            let mut first_failure = None;
            for method in methods.iter().filter(|m| m.method_name == query.name) {
                match self.check(provider, method, query) {
                    Ok(()) => {
                        debug!(provider = %provider, method = %query.name, "computation method bound");
                        return Ok(MethodRef {
                            owner: provider.clone(),
                            name: query.name.clone(),
                        });
                    }
                    Err(failure) => {
                        first_failure.get_or_insert(failure);
                    }
                }
            }

            if let Some(failure) = first_failure {
                return Err(failure);
            }
        }

        Err(MethodFailure::NoMatch {
            method: query.name.clone(),
        })
    }

    /// Return type, arity, then each parameter in order
    fn check(&self, owner: &str, method: &CandidateMethod, query: &MethodQuery) -> Result<(), MethodFailure> {
        let returned = TypeRef::parse(&method.return_type_name);
        if !self.checker.check_return(&query.return_type, &returned).is_compatible() {
            return Err(MethodFailure::ReturnType {
                owner: owner.to_string(),
                method: query.name.clone(),
                required: query.return_type.clone(),
                found: returned,
            });
        }

        if method.parameter_type_names.len() != query.parameters.len() {
            return Err(MethodFailure::ParameterCount {
                owner: owner.to_string(),
                method: query.name.clone(),
                required: query.parameters.len(),
                found: method.parameter_type_names.len(),
            });
        }

        for (position, (param, expected)) in method
            .parameter_type_names
            .iter()
            .zip(&query.parameters)
            .enumerate()
        {
            let param = TypeRef::parse(param);
            if !self.checker.is_assignable(&param, &expected.type_ref) {
                return Err(MethodFailure::ParameterType {
                    owner: owner.to_string(),
                    method: query.name.clone(),
                    position,
                    required: expected.type_ref.clone(),
                    found: param,
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declared::MethodCatalog;

    fn query(params: &[(&str, &str)]) -> MethodQuery {
        MethodQuery {
            name: "toFullName".to_string(),
            return_type: TypeRef::parse("String"),
            parameters: params
                .iter()
                .map(|(t, n)| ExpectedParameter {
                    type_ref: TypeRef::parse(t),
                    name: n.to_string(),
                })
                .collect(),
        }
    }

    fn catalog() -> MethodCatalog {
        [
            CandidateMethod::new("app.Names", "toFullName", "String", ["String"]),
            CandidateMethod::new("app.Names", "toFullName", "String", ["String", "String"]),
            CandidateMethod::new("app.Numbers", "toTotal", "long", ["int"]),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_overload_match() {
        let catalog = catalog();
        let resolver = MethodResolver::new(&catalog, CompatibilityChecker::new());
        let mut warnings = Diagnostics::new();

        let bound = resolver
            .resolve(
                "app.UserDto",
                "fullName",
                &query(&[("String", "firstName"), ("String", "lastName")]),
                &["app.Names".to_string()],
                &mut warnings,
            )
            .unwrap();
        assert_eq!(bound.owner, "app.Names");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_first_overload_failure_is_reported() {
        let catalog = catalog();
        let resolver = MethodResolver::new(&catalog, CompatibilityChecker::new());
        let mut warnings = Diagnostics::new();

        let failure = resolver
            .resolve(
                "app.UserDto",
                "fullName",
                &query(&[("int", "a"), ("int", "b"), ("int", "c")]),
                &["app.Names".to_string()],
                &mut warnings,
            )
            .unwrap_err();
        assert_eq!(failure.code(), DiagnosticCode::IncompatibleParameterCount);
        assert!(failure.to_string().contains("Required: 3, Found: 1"));
    }

    #[test]
    fn test_unknown_provider_warns_and_continues() {
        let catalog = catalog();
        let resolver = MethodResolver::new(&catalog, CompatibilityChecker::new());
        let mut warnings = Diagnostics::new();

        let bound = resolver.resolve(
            "app.UserDto",
            "fullName",
            &query(&[("String", "firstName")]),
            &["app.Missing".to_string(), "app.Names".to_string()],
            &mut warnings,
        );
        assert!(bound.is_ok());
        assert_eq!(warnings.with_code(DiagnosticCode::UnknownProvider).count(), 1);
    }

    #[test]
    fn test_no_match_and_signature() {
        let catalog = catalog();
        let resolver = MethodResolver::new(&catalog, CompatibilityChecker::new());
        let mut warnings = Diagnostics::new();
        let q = query(&[("java.lang.String", "firstName"), ("int", "age")]);

        let failure = resolver
            .resolve("app.UserDto", "fullName", &q, &["app.Numbers".to_string()], &mut warnings)
            .unwrap_err();
        assert_eq!(failure.code(), DiagnosticCode::NoMatchingComputationMethod);
        assert_eq!(
            q.expected_signature(),
            "public java.lang.String toFullName(java.lang.String firstName, int age);"
        );
    }
}
