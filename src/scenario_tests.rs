//! End-to-End Scenario Tests
//!
//! Render a form on the server, parse the markup into a `Document` and attach
//! a `ReactiveController` to it. The client must start in exactly the state the
//! server rendered, and must agree with a fresh server evaluation after every
//! interaction.

#[cfg(test)]
mod tests {
    use crate::animation::AnimationConfig;
    use crate::controller::ReactiveController;
    use crate::dom::Document;
    use crate::error::DependencyResult;
    use crate::evaluator::VisibilityEvaluator;
    use crate::field::{FieldValue, FieldValues};
    use crate::form::{FieldGroupBuilder, Form, FormBuilder, RowPrototype};
    use crate::guard::RenderContext;
    use crate::pipeline::FieldOptions;
    use crate::script::{form_script_body, namespace, validate_script};
    use crate::tree::{CascadeMode, CheckboxTree, TreeNode};

    fn values(pairs: &[(&str, FieldValue)]) -> FieldValues {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn mock_plan_form() -> Form {
        let mut builder = FormBuilder::new("plan").animation(AnimationConfig::none());
        builder
            .add(
                "plan",
                "choice",
                FieldOptions::new().choice("free", "Free").choice("pro", "Pro"),
            )
            .unwrap()
            .add("pro_options", "group", FieldOptions::new().label("Pro options"))
            .unwrap()
            .add_to(
                "pro_options",
                "seats",
                "choice",
                FieldOptions::new().choice("10", "10").choice("50", "50"),
            )
            .unwrap()
            .add_to("pro_options", "discount_code", "text", FieldOptions::new())
            .unwrap();
        builder
            .depends_on("pro_options", "plan", ["pro"])
            .depends_on("discount_code", "seats", ["50"]);
        builder.build().unwrap()
    }

    fn attach(form: &Form, snapshot: &FieldValues) -> ReactiveController {
        let mut ctx = RenderContext::new();
        let html = form.render(snapshot, &mut ctx).unwrap();
        ReactiveController::attach(Document::parse(&html), form.controller_config()).unwrap()
    }

    fn assert_agrees(form: &Form, controller: &ReactiveController, snapshot: &FieldValues) {
        let server = form.evaluate(snapshot);
        for (field, visible) in controller.visibility() {
            assert_eq!(
                server.is_visible(&field),
                visible,
                "server and client disagree on {}",
                field
            );
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // SERVER / CLIENT AGREEMENT
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_initial_state_matches_server_render() {
        let form = mock_plan_form();
        for snapshot in [
            values(&[]),
            values(&[("plan", FieldValue::text("pro"))]),
            values(&[
                ("plan", FieldValue::text("pro")),
                ("seats", FieldValue::text("50")),
            ]),
            values(&[
                ("plan", FieldValue::text("free")),
                ("seats", FieldValue::text("50")),
            ]),
        ] {
            let controller = attach(&form, &snapshot);
            assert_eq!(controller.visibility().len(), 2);
            assert_agrees(&form, &controller, &snapshot);
        }
    }

    #[test]
    fn test_nested_controller_hidden_with_its_container() {
        let form = mock_plan_form();
        let snapshot = values(&[
            ("plan", FieldValue::text("free")),
            ("seats", FieldValue::text("50")),
        ]);
        let server = form.evaluate(&snapshot);
        assert!(!server.is_visible("pro_options"));
        assert!(!server.is_visible("seats"));
        assert!(!server.is_visible("discount_code"));

        let controller = attach(&form, &snapshot);
        assert_eq!(controller.is_visible("discount_code"), Some(false));
        let seats = controller.control("seats").unwrap();
        assert!(controller.document().disabled(seats));
    }

    #[test]
    fn test_interaction_keeps_agreement() {
        let form = mock_plan_form();
        let mut controller = attach(&form, &values(&[("plan", FieldValue::text("free"))]));
        let plan = controller.control("plan").unwrap();
        let seats = controller.control("seats").unwrap();

        controller.set_value(plan, "pro").unwrap();
        controller.set_value(seats, "50").unwrap();
        let snapshot = values(&[
            ("plan", FieldValue::text("pro")),
            ("seats", FieldValue::text("50")),
        ]);
        assert_eq!(controller.is_visible("discount_code"), Some(true));
        assert_agrees(&form, &controller, &snapshot);

        controller.set_value(plan, "free").unwrap();
        // Hiding the container cleared `seats`.
        let snapshot = values(&[("plan", FieldValue::text("free"))]);
        assert!(controller.document().selected(seats).is_empty());
        assert_agrees(&form, &controller, &snapshot);
    }

    #[test]
    fn test_batch_evaluation_matches_single() {
        let form = mock_plan_form();
        let snapshots: Vec<FieldValues> = [
            values(&[("plan", FieldValue::text("pro"))]),
            values(&[
                ("plan", FieldValue::text("pro")),
                ("seats", FieldValue::text("50")),
            ]),
        ]
        .iter()
        .map(|s| form.values_with_defaults(s))
        .collect();

        let evaluator = VisibilityEvaluator::new(form.graph());
        let batch = evaluator.evaluate_batch(&snapshots);
        for (snapshot, result) in snapshots.iter().zip(&batch) {
            assert_eq!(*result, evaluator.evaluate(snapshot));
        }
        assert!(!batch[0].is_visible("discount_code"));
        assert!(batch[1].is_visible("discount_code"));
    }

    #[test]
    fn test_rendered_script_is_valid() {
        let form = mock_plan_form();
        let config = form.controller_config();
        let body = form_script_body(&config);
        validate_script(&namespace(form.id()), &body).unwrap();

        let mut ctx = RenderContext::new();
        let html = form.render(&FieldValues::new(), &mut ctx).unwrap();
        assert!(html.contains(&config.to_json()));
    }

    #[test]
    fn test_required_select_without_value_shows_first_option_dependent() {
        let mut builder = FormBuilder::new("signup").animation(AnimationConfig::none());
        builder
            .add(
                "account_type",
                "choice",
                FieldOptions::new()
                    .required()
                    .choice("business", "Business")
                    .choice("personal", "Personal"),
            )
            .unwrap()
            .add("company", "text", FieldOptions::new())
            .unwrap();
        builder.depends_on("company", "account_type", ["business"]);
        let form = builder.build().unwrap();

        let snapshot = values(&[]);
        assert!(form.evaluate(&snapshot).is_visible("company"));
        let controller = attach(&form, &snapshot);
        assert_eq!(controller.is_visible("company"), Some(true));
        assert_agrees(&form, &controller, &snapshot);
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // REPEATERS
    // ═══════════════════════════════════════════════════════════════════════════════

    struct Contact;

    impl RowPrototype for Contact {
        fn build_row(&self, row: &mut FieldGroupBuilder<'_>) -> DependencyResult<()> {
            row.add(
                "channel",
                "choice",
                FieldOptions::new().choice("phone", "Phone").choice("email", "Email"),
            )?
            .add("extension", "text", FieldOptions::new())?;
            row.depends_on("extension", "channel", ["phone"]);
            Ok(())
        }
    }

    fn mock_contact_form() -> Form {
        let mut builder = FormBuilder::new("contacts").animation(AnimationConfig::none());
        builder
            .repeater("contacts", &Contact, 1, FieldOptions::new())
            .unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn test_added_row_is_wired_like_rendered_rows() {
        let form = mock_contact_form();
        let mut controller = attach(&form, &values(&[]));

        let row = controller.add_repeater_row("contacts").unwrap().unwrap();
        assert_eq!(
            controller.document().attr(row, "data-repeater-row"),
            Some("1")
        );
        assert_eq!(controller.is_visible("contacts[1][extension]"), Some(false));

        let channel = controller.control("contacts[1][channel]").unwrap();
        controller.set_value(channel, "phone").unwrap();
        assert_eq!(controller.is_visible("contacts[1][extension]"), Some(true));
        assert_eq!(controller.is_visible("contacts[0][extension]"), Some(false));

        let events = controller.take_events();
        let added = events.iter().find(|e| e.name == "repeater:add").unwrap();
        assert_eq!(added.detail["index"], 1);
    }

    #[test]
    fn test_removed_row_leaves_document() {
        let form = mock_contact_form();
        let mut controller = attach(&form, &values(&[]));
        assert!(controller.remove_repeater_row("contacts", 0));
        assert!(controller.wrapper("contacts[0][extension]").is_none());
        assert!(!controller.remove_repeater_row("contacts", 0));
        assert!(controller
            .events()
            .iter()
            .any(|e| e.name == "repeater:remove"));

        // With no rows left numbering starts over.
        let row = controller.add_repeater_row("contacts").unwrap().unwrap();
        assert_eq!(
            controller.document().attr(row, "data-repeater-row"),
            Some("0")
        );
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // TREES INSIDE DEPENDENTS
    // ═══════════════════════════════════════════════════════════════════════════════

    fn mock_notify_form() -> Form {
        let channels = CheckboxTree::new(
            "channels",
            CascadeMode::Cascade,
            vec![TreeNode::new("all", "All channels")
                .child(TreeNode::new("email", "Email").checked(true))
                .child(TreeNode::new("sms", "SMS"))],
        )
        .unwrap();

        let mut builder = FormBuilder::new("notify").animation(AnimationConfig::none());
        builder
            .add("notify", "checkbox", FieldOptions::new().label("Notify me"))
            .unwrap()
            .tree(channels, None, FieldOptions::new().label("Channels"))
            .unwrap();
        builder.depends_on("channels", "notify", [""]);
        builder.build().unwrap()
    }

    #[test]
    fn test_hiding_tree_clears_its_selection() {
        let form = mock_notify_form();
        let mut controller = attach(&form, &values(&[("notify", FieldValue::Bool(true))]));
        assert_eq!(controller.is_visible("channels"), Some(true));
        assert_eq!(controller.tree_checked_values("channels").unwrap(), vec!["email"]);

        let all = controller.tree("channels").unwrap().input_for("all").unwrap();
        assert!(controller.document().indeterminate(all));

        let notify = controller.control("notify").unwrap();
        controller.set_checked(notify, false).unwrap();
        assert_eq!(controller.is_visible("channels"), Some(false));
        assert!(controller.tree_checked_values("channels").unwrap().is_empty());
        assert!(!controller.document().indeterminate(all));
    }

    #[test]
    fn test_tree_hidden_on_server_starts_disabled() {
        let form = mock_notify_form();
        let controller = attach(&form, &values(&[]));
        assert_eq!(controller.is_visible("channels"), Some(false));
        let email = controller.tree("channels").unwrap().input_for("email").unwrap();
        assert!(controller.document().disabled(email));
        // Disabled on attach, not cleared.
        assert!(controller.document().checked(email));
    }
}
