//! Node bindings. JSON in, JSON or markup out.

use napi_derive::napi;

use crate::animation::AnimationConfig;
use crate::controller::TreeConfig;
use crate::declaration::DependencyDeclaration;
use crate::evaluator::evaluate;
use crate::field::FieldValues;
use crate::guard::RenderContext;
use crate::tree::CascadeMode;

fn parse_json<T: serde::de::DeserializeOwned>(json: &str, what: &str) -> napi::Result<T> {
    serde_json::from_str(json)
        .map_err(|e| napi::Error::from_reason(format!("{} parse error: {}", what, e)))
}

/// Visibility of every dependent (and its contents) as `{ field: bool }`.
#[napi]
pub fn evaluate_visibility_native(
    declarations_json: String,
    values_json: String,
) -> napi::Result<serde_json::Value> {
    let declarations: Vec<DependencyDeclaration> = parse_json(&declarations_json, "Declarations")?;
    let values: FieldValues = parse_json(&values_json, "Values")?;
    let map = evaluate(&declarations, &values).map_err(|e| napi::Error::from_reason(e.to_string()))?;
    serde_json::to_value(map.into_map()).map_err(|e| napi::Error::from_reason(e.to_string()))
}

/// Controller `<script>` block for a form. Each call is its own render pass.
#[napi]
pub fn render_form_script_native(
    form_id: String,
    animation_json: Option<String>,
    trees_json: Option<String>,
) -> napi::Result<String> {
    let mut ctx = RenderContext::new();
    if let Some(json) = animation_json {
        let animation: AnimationConfig = parse_json(&json, "Animation")?;
        ctx.set_animation(&form_id, animation);
    }
    let trees: Vec<TreeConfig> = match trees_json {
        Some(json) => parse_json(&json, "Trees")?,
        None => Vec::new(),
    };
    Ok(ctx.form_script(&form_id, &trees).unwrap_or_default())
}

#[napi]
pub fn render_tree_script_native(tree_id: String, mode: Option<String>) -> napi::Result<String> {
    let mode = match mode.as_deref() {
        None | Some("cascade") => CascadeMode::Cascade,
        Some("independent") => CascadeMode::Independent,
        Some(other) => {
            return Err(napi::Error::from_reason(format!(
                "Unknown cascade mode: {}",
                other
            )))
        }
    };
    let mut ctx = RenderContext::new();
    Ok(ctx.tree_script(&tree_id, mode).unwrap_or_default())
}
