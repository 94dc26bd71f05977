//! Model reconstruction over the external variables.

use partial_ref::{partial, PartialRef};

use ipasat_formula::Lit;

use crate::context::{parts::*, Context};
use crate::state::SatState;

/// Assignment of the external variables.
///
/// Whenever the solver state is SAT this must be up to date.
#[derive(Default)]
pub struct Model {
    assignment: Vec<Option<bool>>,
}

impl Model {
    /// Whether a given external literal is true in the model.
    ///
    /// Only valid if the solver state is SAT.
    pub fn lit_is_true(&self, external_lit: Lit) -> bool {
        self.assignment
            .get(external_lit.index())
            .cloned()
            .flatten()
            .map(|value| value == external_lit.is_positive())
            .unwrap_or(false)
    }
}

/// Build the external model from the internal assignment.
///
/// Mapped variables take their search values, fixed variables their remembered units. The
/// reconstruction stack is replayed in reverse to extend the model over eliminated and
/// substituted variables. Any variable still unassigned afterwards is unconstrained and
/// defaults to false.
pub fn reconstruct_model(
    mut ctx: partial!(
        Context,
        mut ModelP,
        mut SolverStateP,
        AssignmentP,
        ExtensionP,
        VariablesP
    ),
) {
    let (model, mut ctx) = ctx.split_part_mut(ModelP);
    let (variables, mut ctx) = ctx.split_part(VariablesP);
    let (extension, mut ctx) = ctx.split_part(ExtensionP);

    model.assignment.clear();
    model
        .assignment
        .resize(variables.external_watermark(), None);

    for ext in variables.external_var_iter() {
        let value = if let Some(int) = variables.try_internal_from_external(ext) {
            ctx.part(AssignmentP).var_value(int)
        } else {
            variables.var_data_external(ext).unit
        };
        model.assignment[ext.index()] = value;
    }

    extension.extend_model(&mut model.assignment);

    for value in model.assignment.iter_mut() {
        if value.is_none() {
            *value = Some(false);
        }
    }

    ctx.part_mut(SolverStateP).sat_state = SatState::Sat;
}
