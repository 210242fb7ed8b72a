//! Message signature definitions

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

use super::{Expr, LookupError};

/// A single payload slot of a message
///
/// The name may be empty (type-only payload). Array payloads carry one
/// parameter expression per dimension, like parameterised roles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MsgPayload {
    name: String,
    ty: String,
    dimensions: Vec<Expr>,
}

impl MsgPayload {
    /// Type-only payload
    pub fn new(ty: impl Into<String>) -> Self {
        Self::named("", ty)
    }

    pub fn named(name: impl Into<String>, ty: impl Into<String>) -> Self {
        MsgPayload {
            name: name.into(),
            ty: ty.into(),
            dimensions: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_param(mut self, param: Expr) -> Self {
        self.add_param(param);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &str {
        &self.ty
    }

    pub fn add_param(&mut self, param: Expr) {
        self.dimensions.push(param);
    }

    pub fn num_dimen(&self) -> usize {
        self.dimensions.len()
    }

    pub fn dimensions(&self) -> &[Expr] {
        &self.dimensions
    }

    /// Same type and identical dimensions; the slot name is ignored.
    pub fn same_shape(&self, other: &MsgPayload) -> bool {
        self.ty == other.ty
            && self.dimensions.len() == other.dimensions.len()
            && self
                .dimensions
                .iter()
                .zip(&other.dimensions)
                .all(|(a, b)| a.is_identical(b))
    }
}

impl Display for MsgPayload {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if !self.name.is_empty() {
            write!(f, "{}: ", self.name)?;
        }
        write!(f, "{}", self.ty)?;
        for dim in &self.dimensions {
            write!(f, "[{dim}]")?;
        }
        Ok(())
    }
}

/// Message signature: a label and an ordered list of payloads
///
/// An empty label stands for an unlabelled message.
///
/// # Examples
///
/// ```
/// use sesstype::ast::{MsgPayload, MsgSig};
///
/// let mut sig = MsgSig::new("Data");
/// sig.add_payload(MsgPayload::new("float"));
/// sig.add_payload(MsgPayload::named("count", "int"));
///
/// assert_eq!(sig.num_payload(), 2);
/// assert!(sig.has_payload(""));
/// assert!(!sig.has_payload("int"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MsgSig {
    label: String,
    payloads: Vec<MsgPayload>,
}

impl MsgSig {
    pub fn new(label: impl Into<String>) -> Self {
        MsgSig {
            label: label.into(),
            payloads: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_payload(mut self, payload: MsgPayload) -> Self {
        self.add_payload(payload);
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    pub fn has_label(&self) -> bool {
        !self.label.is_empty()
    }

    pub fn add_payload(&mut self, payload: MsgPayload) {
        self.payloads.push(payload);
    }

    pub fn num_payload(&self) -> usize {
        self.payloads.len()
    }

    pub fn payload(&self, idx: usize) -> Result<&MsgPayload, LookupError> {
        self.payloads
            .get(idx)
            .ok_or_else(|| LookupError::PayloadOutOfRange {
                label: self.label.clone(),
                index: idx,
                len: self.payloads.len(),
            })
    }

    pub fn payloads(&self) -> &[MsgPayload] {
        &self.payloads
    }

    /// True if some payload slot is named `name` (`""` finds unnamed slots).
    pub fn has_payload(&self, name: &str) -> bool {
        self.payloads.iter().any(|p| p.name == name)
    }

    /// Structural message equality used by the comparator
    ///
    /// An absent label on either side matches any label. Payloads must agree
    /// in count, type and dimensions.
    pub fn is_compatible(&self, other: &MsgSig) -> bool {
        let labels = !self.has_label() || !other.has_label() || self.label == other.label;
        labels
            && self.payloads.len() == other.payloads.len()
            && self
                .payloads
                .iter()
                .zip(&other.payloads)
                .all(|(a, b)| a.same_shape(b))
    }
}

impl Display for MsgSig {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.label)?;
        for (i, payload) in self.payloads.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{payload}")?;
        }
        write!(f, ")")
    }
}
