//! # Scenario Files
//!
//! A scenario declares single-entity leaf inputs, an ordered list of
//! operations over them, and which results to report. Files are YAML or
//! JSON, chosen by extension:
//!
//! ```yaml
//! entities: 2
//! inputs:
//!   x: { entity: 0, values: [3.0], lower: 0.0, upper: 10.0 }
//!   y: { entity: 1, values: [2.0], lower: 0.0, upper: 5.0 }
//! steps:
//!   - { out: total, op: add, lhs: x, rhs: y }
//!   - { out: scaled, op: mul, lhs: total, rhs: 0.5 }
//! outputs: [total, scaled]
//! ```
//!
//! [`Scenario::check`] resolves every reference without touching numbers;
//! [`Scenario::evaluate`] runs the algebra and builds a [`Report`].

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use anyhow::{bail, Context, Result};
use ndarray::{ArrayD, IxDyn};
use serde::{Deserialize, Serialize};

use sens_core::{EntityCount, EntityId, Sentinel};
use sens_tensor::{BoundedContributionTensor, Operand, PublicConstant};

type Tensor = BoundedContributionTensor<f64>;

// ---------------------------------------------------------------------------
// File model
// ---------------------------------------------------------------------------

/// A complete scenario file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Number of entities `E` shared by every tensor.
    pub entities: EntityCount,
    /// Overrides the default inactive-entity sentinel for every input.
    #[serde(default)]
    pub sentinel: Option<Sentinel<f64>>,
    /// Leaf tensors by name.
    pub inputs: BTreeMap<String, LeafInput>,
    /// Operations, applied in order.
    #[serde(default)]
    pub steps: Vec<Step>,
    /// Names of inputs or step results to report.
    pub outputs: Vec<String>,
}

/// A leaf owned by one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LeafInput {
    pub entity: EntityId,
    /// Element values in row-major order.
    pub values: Vec<f64>,
    /// Tensor shape; a flat vector when omitted.
    #[serde(default)]
    pub shape: Option<Vec<usize>>,
    pub lower: DeclaredBound,
    pub upper: DeclaredBound,
}

/// A declared bound: one number for every element, or one per element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeclaredBound {
    Scalar(f64),
    PerElement(Vec<f64>),
}

/// One operation in the evaluation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Step {
    /// Name bound to the result.
    pub out: String,
    pub op: OpKind,
    /// Name of the bounded left-hand operand.
    pub lhs: String,
    /// Right-hand operand of binary operations.
    #[serde(default)]
    pub rhs: Option<OperandRef>,
    /// Leak of `hard_sigmoid_deriv`; 0.01 when omitted.
    #[serde(default)]
    pub leak: Option<f64>,
}

/// Right-hand side of a step: a public number or the name of a tensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OperandRef {
    Public(f64),
    Name(String),
}

/// Operations a step may apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    Add,
    Sub,
    Mul,
    Div,
    Neg,
    Gt,
    Lt,
    ClampMin,
    ClampMax,
    HardSigmoid,
    HardSigmoidDeriv,
}

impl OpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::Neg => "neg",
            Self::Gt => "gt",
            Self::Lt => "lt",
            Self::ClampMin => "clamp_min",
            Self::ClampMax => "clamp_max",
            Self::HardSigmoid => "hard_sigmoid",
            Self::HardSigmoidDeriv => "hard_sigmoid_deriv",
        }
    }

    /// Whether the operation takes a right-hand operand.
    pub fn is_binary(&self) -> bool {
        !matches!(self, Self::Neg | Self::HardSigmoid | Self::HardSigmoidDeriv)
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Loading and checking
// ---------------------------------------------------------------------------

impl Scenario {
    /// Read a scenario from a `.yaml`, `.yml` or `.json` file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let scenario = match extension.as_deref() {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
                .with_context(|| format!("failed to parse YAML scenario {}", path.display()))?,
            Some("json") => serde_json::from_str(&content)
                .with_context(|| format!("failed to parse JSON scenario {}", path.display()))?,
            _ => bail!(
                "unsupported scenario extension for {} (expected .yaml, .yml or .json)",
                path.display()
            ),
        };
        tracing::debug!(path = %path.display(), "loaded scenario");
        Ok(scenario)
    }

    /// Verify that every name is defined once, every reference points at an
    /// earlier definition, and every step has the operands its operation
    /// needs.
    pub fn check(&self) -> Result<()> {
        let count = self.entities;
        let mut defined: Vec<&str> = Vec::new();

        for (name, input) in &self.inputs {
            input
                .entity
                .check(count)
                .with_context(|| format!("input '{name}'"))?;
            defined.push(name);
        }

        for (i, step) in self.steps.iter().enumerate() {
            let at = || format!("step {} ('{}')", i + 1, step.out);
            if defined.contains(&step.out.as_str()) {
                bail!("{}: name '{}' is already defined", at(), step.out);
            }
            if !defined.contains(&step.lhs.as_str()) {
                bail!("{}: unknown operand '{}'", at(), step.lhs);
            }
            match (&step.rhs, step.op.is_binary()) {
                (None, true) => bail!("{}: {} needs a right-hand operand", at(), step.op),
                (Some(_), false) => bail!("{}: {} takes no right-hand operand", at(), step.op),
                (Some(OperandRef::Name(rhs)), true) if !defined.contains(&rhs.as_str()) => {
                    bail!("{}: unknown operand '{}'", at(), rhs)
                }
                _ => {}
            }
            if step.leak.is_some() && step.op != OpKind::HardSigmoidDeriv {
                bail!("{}: leak only applies to hard_sigmoid_deriv", at());
            }
            defined.push(&step.out);
        }

        if self.outputs.is_empty() {
            bail!("scenario requests no outputs");
        }
        for output in &self.outputs {
            if !defined.contains(&output.as_str()) {
                bail!("unknown output '{output}'");
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Evaluation
    // -----------------------------------------------------------------------

    /// Check, build the leaves, run every step and report the outputs.
    pub fn evaluate(&self) -> Result<Report> {
        self.check()?;

        let mut env: BTreeMap<&str, Tensor> = BTreeMap::new();
        for (name, input) in &self.inputs {
            let leaf = self
                .build_input(input)
                .with_context(|| format!("input '{name}'"))?;
            env.insert(name, leaf);
        }

        for step in &self.steps {
            let result = apply(step, &env)
                .with_context(|| format!("step '{}' ({})", step.out, step.op))?;
            tracing::debug!(out = %step.out, op = %step.op, "applied step");
            env.insert(&step.out, result);
        }

        let outputs = self
            .outputs
            .iter()
            .map(|name| {
                let tensor = lookup(&env, name)?;
                Ok(OutputReport::new(name, tensor))
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::info!(
            inputs = self.inputs.len(),
            steps = self.steps.len(),
            outputs = outputs.len(),
            "evaluated scenario"
        );
        Ok(Report {
            entities: self.entities.get(),
            outputs,
        })
    }

    fn build_input(&self, input: &LeafInput) -> Result<Tensor> {
        let shape = input
            .shape
            .clone()
            .unwrap_or_else(|| vec![input.values.len()]);
        let values = ArrayD::from_shape_vec(IxDyn(&shape), input.values.clone())
            .with_context(|| format!("{} values do not fill shape {shape:?}", input.values.len()))?;
        let lower = input.lower.to_public(&shape)?;
        let upper = input.upper.to_public(&shape)?;

        let leaf =
            BoundedContributionTensor::from_entity_bounds(values, lower, upper, input.entity, self.entities)?;
        Ok(match self.sentinel {
            Some(sentinel) => leaf.with_sentinel(sentinel),
            None => leaf,
        })
    }
}

impl DeclaredBound {
    fn to_public(&self, shape: &[usize]) -> Result<PublicConstant<f64>> {
        match self {
            Self::Scalar(k) => Ok(PublicConstant::Scalar(*k)),
            Self::PerElement(v) => ArrayD::from_shape_vec(IxDyn(shape), v.clone())
                .map(PublicConstant::Tensor)
                .with_context(|| format!("{} bounds do not fill shape {shape:?}", v.len())),
        }
    }
}

fn lookup<'e>(env: &'e BTreeMap<&str, Tensor>, name: &str) -> Result<&'e Tensor> {
    env.get(name)
        .with_context(|| format!("unknown operand '{name}'"))
}

fn apply(step: &Step, env: &BTreeMap<&str, Tensor>) -> Result<Tensor> {
    let lhs = lookup(env, &step.lhs)?;
    let rhs = match &step.rhs {
        Some(OperandRef::Public(k)) => Some(Operand::from(*k)),
        Some(OperandRef::Name(name)) => Some(Operand::from(lookup(env, name)?)),
        None => None,
    };

    let result = match (step.op, rhs) {
        (OpKind::Add, Some(rhs)) => lhs.try_add(rhs),
        (OpKind::Sub, Some(rhs)) => lhs.try_sub(rhs),
        (OpKind::Mul, Some(rhs)) => lhs.try_mul(rhs),
        (OpKind::Div, Some(rhs)) => lhs.try_div(rhs),
        (OpKind::Gt, Some(rhs)) => lhs.gt(rhs),
        (OpKind::Lt, Some(rhs)) => lhs.lt(rhs),
        (OpKind::ClampMin, Some(rhs)) => lhs.clamp_min(rhs),
        (OpKind::ClampMax, Some(rhs)) => lhs.clamp_max(rhs),
        (OpKind::Neg, None) => Ok(-lhs),
        (OpKind::HardSigmoid, None) => lhs.hard_sigmoid(),
        (OpKind::HardSigmoidDeriv, None) => match step.leak {
            Some(leak) => lhs.hard_sigmoid_deriv(leak),
            None => lhs.hard_sigmoid_deriv_default(),
        },
        (op, _) => bail!("{op} called with the wrong number of operands"),
    };
    Ok(result?)
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Evaluation result for every requested output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub entities: usize,
    pub outputs: Vec<OutputReport>,
}

/// Derived bounds of one tensor, flattened in row-major order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputReport {
    pub name: String,
    pub shape: Vec<usize>,
    pub values: Vec<f64>,
    pub max_vals: Vec<f64>,
    pub min_vals: Vec<f64>,
    pub sensitivity: Vec<f64>,
    pub max_entity_sensitivity: Vec<f64>,
}

impl OutputReport {
    fn new(name: &str, tensor: &Tensor) -> Self {
        let flat = |a: &ArrayD<f64>| a.iter().copied().collect::<Vec<_>>();
        Self {
            name: name.to_string(),
            shape: tensor.shape().to_vec(),
            values: flat(tensor.values()),
            max_vals: flat(&tensor.max_vals()),
            min_vals: flat(&tensor.min_vals()),
            sensitivity: flat(&tensor.sensitivity()),
            max_entity_sensitivity: flat(&tensor.max_entity_sensitivity()),
        }
    }
}
