//! Failure taxonomy of the pipeline.
//!
//! Every stage reports through [`PotentialError`]; the caller of `compute` sees the flattened
//! [`Failure`] (kind plus a message in the requested [`Locale`]).
use std::fmt;
use strum_macros::{Display, EnumIter, EnumString};
use thiserror::Error;

/// The enumerated failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum ErrorKind {
    ParseError,
    UndeclaredVariableError,
    IntegrationError,
    InconsistentFieldError,
    ComplexResultError,
    NonFiniteResultError,
    UnexpectedError,
}

/// Language of the human-readable messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum Locale {
    #[default]
    #[strum(serialize = "en")]
    En,
    #[strum(serialize = "ru")]
    Ru,
}

/// which of the two force components an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Component {
    Fx,
    Fy,
}

/// coordinate axis of an integration or a consistency check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Axis {
    #[strum(serialize = "x")]
    X,
    #[strum(serialize = "y")]
    Y,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PotentialError {
    #[error("invalid expression for {component}: {input}. Detail: {detail}")]
    Parse {
        component: Component,
        input: String,
        detail: String,
    },
    #[error(
        "undeclared variables used in {component}: {}. Only x and y are allowed",
        .names.join(", ")
    )]
    UndeclaredVariables {
        component: Component,
        names: Vec<String>,
    },
    #[error("could not integrate {component} with respect to {axis}: {detail}")]
    Integration {
        component: Component,
        axis: Axis,
        detail: String,
    },
    #[error(
        "integration with respect to {axis} gave an incorrect result: {}",
        residual_note(.undetermined)
    )]
    InconsistentField { axis: Axis, undetermined: bool },
    #[error("the potential energy has complex values ({value}). Check the force field")]
    ComplexResult { value: String },
    #[error(
        "the potential energy contains infinite or undefined values ({count} of {total} samples). Check the force field"
    )]
    NonFiniteResult { count: usize, total: usize },
    #[error("unexpected error during computation: {0}")]
    Unexpected(String),
}

fn residual_note(undetermined: &bool) -> &'static str {
    if *undetermined {
        "the residual could not be reduced to zero"
    } else {
        "the residual is not zero"
    }
}

impl PotentialError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PotentialError::Parse { .. } => ErrorKind::ParseError,
            PotentialError::UndeclaredVariables { .. } => ErrorKind::UndeclaredVariableError,
            PotentialError::Integration { .. } => ErrorKind::IntegrationError,
            PotentialError::InconsistentField { .. } => ErrorKind::InconsistentFieldError,
            PotentialError::ComplexResult { .. } => ErrorKind::ComplexResultError,
            PotentialError::NonFiniteResult { .. } => ErrorKind::NonFiniteResultError,
            PotentialError::Unexpected(_) => ErrorKind::UnexpectedError,
        }
    }

    /// Message in the requested language. English is the `Display` text.
    pub fn localized(&self, locale: Locale) -> String {
        match locale {
            Locale::En => self.to_string(),
            Locale::Ru => match self {
                PotentialError::Parse { input, detail, .. } => {
                    format!("Некорректное выражение: {}. Деталь: {}", input, detail)
                }
                PotentialError::UndeclaredVariables { names, .. } => format!(
                    "Использованы неопределенные переменные: {}. Допустимы только x и y.",
                    names.join(", ")
                ),
                PotentialError::Integration {
                    component,
                    axis,
                    detail,
                } => format!(
                    "Не удалось проинтегрировать {} по {}: {}",
                    component, axis, detail
                ),
                PotentialError::InconsistentField { axis, .. } => {
                    format!("Интегрирование по {} дало некорректный результат.", axis)
                }
                PotentialError::ComplexResult { .. } => "Потенциальная энергия имеет комплексные значения. Проверьте корректность силового поля.".to_string(),
                PotentialError::NonFiniteResult { .. } => "Потенциальная энергия содержит бесконечные или неопределенные значения. Проверьте корректность силового поля.".to_string(),
                PotentialError::Unexpected(detail) => {
                    format!("Неизвестная ошибка при вычислении: {}", detail)
                }
            },
        }
    }

    pub fn to_failure(&self, locale: Locale) -> Failure {
        Failure {
            kind: self.kind(),
            message: self.localized(locale),
        }
    }
}

/// What `compute` reports when any stage fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for Failure {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_kinds_are_distinct() {
        let kinds: Vec<ErrorKind> = ErrorKind::iter().collect();
        assert_eq!(kinds.len(), 7);
        assert_eq!(ErrorKind::ParseError.to_string(), "ParseError");
        assert_eq!(
            PotentialError::Unexpected("boom".to_string()).kind(),
            ErrorKind::UnexpectedError
        );
    }

    #[test]
    fn test_undeclared_message() {
        let err = PotentialError::UndeclaredVariables {
            component: Component::Fx,
            names: vec!["a".to_string(), "z".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "undeclared variables used in Fx: a, z. Only x and y are allowed"
        );
        assert_eq!(
            err.localized(Locale::Ru),
            "Использованы неопределенные переменные: a, z. Допустимы только x и y."
        );
    }

    #[test]
    fn test_inconsistent_message() {
        let err = PotentialError::InconsistentField {
            axis: Axis::Y,
            undetermined: false,
        };
        assert!(err.to_string().contains("with respect to y"));
        assert_eq!(
            err.localized(Locale::Ru),
            "Интегрирование по y дало некорректный результат."
        );
        let failure = err.to_failure(Locale::En);
        assert_eq!(failure.kind, ErrorKind::InconsistentFieldError);
        assert!(failure.to_string().starts_with("InconsistentFieldError: "));
    }

    #[test]
    fn test_locale_from_str() {
        assert_eq!(Locale::from_str("ru").unwrap(), Locale::Ru);
        assert_eq!(Locale::from_str("EN").unwrap(), Locale::En);
        assert!(Locale::from_str("de").is_err());
        assert_eq!(Locale::default(), Locale::En);
    }
}
