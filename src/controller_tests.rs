//! Controller Behavior Tests
//!
//! Drive `ReactiveController` over hand-written markup:
//! - chained dependents and transitive hide
//! - multi-valued controllers and the `all` trigger
//! - checkbox trees bound through the controller config
//! - listeners subscribed to visibility changes
//! - animated show/hide style mutations

#[cfg(test)]
mod tests {
    use crate::animation::{AnimationConfig, AnimationKind};
    use crate::controller::{ControllerConfig, ReactiveController};
    use crate::dom::Document;
    use crate::error::DependencyError;
    use crate::events::{FieldEvent, Listener, Propagation, RequiredToggler, REQUIRED_SUSPENDED_ATTR};
    use crate::tree::CascadeMode;

    fn mock_controller(html: &str, config: ControllerConfig) -> ReactiveController {
        ReactiveController::attach(Document::parse(html), config).unwrap()
    }

    fn instant(form_id: &str) -> ControllerConfig {
        ControllerConfig::new(form_id).with_animation(AnimationConfig::none())
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // CHAINS
    // ═══════════════════════════════════════════════════════════════════════════════

    const CHAIN_FORM: &str = r#"<form id="chain">
        <select name="a" data-dependency="true" data-dependency-group="a" data-dependency-field="a">
            <option value="">-</option><option value="on">On</option>
        </select>
        <div data-dependend="a-on" data-dependend-group="a" data-dependend-field="b" style="display: none">
            <select name="b" data-dependency="true" data-dependency-group="b" data-dependency-field="b">
                <option value="">-</option><option value="on">On</option>
            </select>
        </div>
        <div data-dependend="b-on" data-dependend-group="b" data-dependend-field="c" style="display: none">
            <input type="text" name="c" value="">
        </div>
    </form>"#;

    #[test]
    fn test_chain_reveals_step_by_step() {
        let mut controller = mock_controller(CHAIN_FORM, instant("chain"));
        let a = controller.control("a").unwrap();
        let b = controller.control("b").unwrap();

        controller.set_value(a, "on").unwrap();
        assert_eq!(controller.is_visible("b"), Some(true));
        assert_eq!(controller.is_visible("c"), Some(false));

        controller.set_value(b, "on").unwrap();
        assert_eq!(controller.is_visible("c"), Some(true));
    }

    #[test]
    fn test_hiding_head_of_chain_hides_and_clears_tail() {
        let mut controller = mock_controller(CHAIN_FORM, instant("chain"));
        let a = controller.control("a").unwrap();
        let b = controller.control("b").unwrap();
        let c = controller.control("c").unwrap();

        controller.set_value(a, "on").unwrap();
        controller.set_value(b, "on").unwrap();
        controller.set_value(c, "typed").unwrap();

        controller.set_value(a, "").unwrap();
        assert_eq!(controller.is_visible("b"), Some(false));
        assert_eq!(controller.is_visible("c"), Some(false));

        let doc = controller.document();
        assert!(doc.selected(b).is_empty());
        assert!(doc.disabled(b));
        assert_eq!(doc.value(c), "");
        assert!(doc.disabled(c));
    }

    #[test]
    fn test_reshowing_head_keeps_tail_hidden_until_its_controller_matches() {
        let mut controller = mock_controller(CHAIN_FORM, instant("chain"));
        let a = controller.control("a").unwrap();
        let b = controller.control("b").unwrap();

        controller.set_value(a, "on").unwrap();
        controller.set_value(b, "on").unwrap();
        controller.set_value(a, "").unwrap();
        controller.set_value(a, "on").unwrap();

        // `b` was cleared while hidden.
        assert_eq!(controller.is_visible("b"), Some(true));
        assert_eq!(controller.is_visible("c"), Some(false));
        assert!(!controller.document().disabled(b));
    }

    #[test]
    fn test_cyclic_markup_rejected_on_attach() {
        let html = r#"<form id="loop">
            <div data-dependend="y-1" data-dependend-group="y" data-dependend-field="x">
                <input type="text" name="x" data-dependency="true" data-dependency-group="x">
            </div>
            <div data-dependend="x-1" data-dependend-group="x" data-dependend-field="y">
                <input type="text" name="y" data-dependency="true" data-dependency-group="y">
            </div>
        </form>"#;
        let err = ReactiveController::attach(Document::parse(html), instant("loop"))
            .err()
            .unwrap();
        assert!(matches!(err, DependencyError::Cycle { .. }));
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // MULTI-VALUED CONTROLLERS
    // ═══════════════════════════════════════════════════════════════════════════════

    const FEATURES_FORM: &str = r#"<form id="plan">
        <input type="checkbox" name="features" value="api" data-dependency="true" data-dependency-group="features" data-dependency-field="features">
        <input type="checkbox" name="features" value="sso" data-dependency="true" data-dependency-group="features" data-dependency-field="features">
        <div data-dependend="features-sso" data-dependend-group="features" data-dependend-field="idp_url" style="display: none">
            <input type="text" name="idp_url">
        </div>
        <div data-dependend="all" data-dependend-group="features" data-dependend-field="billing_contact" style="display: none">
            <input type="text" name="billing_contact">
        </div>
    </form>"#;

    fn checkbox(controller: &ReactiveController, value: &str) -> usize {
        let doc = controller.document();
        doc.form_controls(Document::ROOT)
            .into_iter()
            .find(|id| doc.attr(*id, "name") == Some("features") && doc.value(*id) == value)
            .unwrap()
    }

    #[test]
    fn test_checkbox_group_union_and_all_trigger() {
        let mut controller = mock_controller(FEATURES_FORM, instant("plan"));
        let api = checkbox(&controller, "api");
        let sso = checkbox(&controller, "sso");

        controller.set_checked(api, true).unwrap();
        assert_eq!(controller.is_visible("idp_url"), Some(false));
        assert_eq!(controller.is_visible("billing_contact"), Some(true));

        controller.set_checked(sso, true).unwrap();
        assert_eq!(controller.is_visible("idp_url"), Some(true));

        controller.set_checked(api, false).unwrap();
        controller.set_checked(sso, false).unwrap();
        assert_eq!(controller.is_visible("idp_url"), Some(false));
        assert_eq!(controller.is_visible("billing_contact"), Some(false));
    }

    #[test]
    fn test_multi_select_any_value_matches() {
        let html = r#"<form id="tags">
            <select name="tags" multiple data-dependency="true" data-dependency-group="tags" data-dependency-field="tags">
                <option value="red">Red</option><option value="blue">Blue</option>
            </select>
            <div data-dependend="tags-blue" data-dependend-group="tags" data-dependend-field="shade" style="display: none">
                <input type="text" name="shade">
            </div>
        </form>"#;
        let mut controller = mock_controller(html, instant("tags"));
        let select = controller.control("tags").unwrap();

        controller.select(select, &["red", "blue"]).unwrap();
        assert_eq!(controller.is_visible("shade"), Some(true));
        controller.select(select, &["red"]).unwrap();
        assert_eq!(controller.is_visible("shade"), Some(false));
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // TREES
    // ═══════════════════════════════════════════════════════════════════════════════

    const TREE_FORM: &str = r#"<form id="perm">
        <div data-checkbox-tree="perm">
            <ul>
                <li data-tree-node="admin"><label><input type="checkbox" data-tree-checkbox name="perm[]" value="admin"> Admin</label>
                    <ul>
                        <li data-tree-node="users"><label><input type="checkbox" data-tree-checkbox name="perm[]" value="users"> Users</label></li>
                        <li data-tree-node="billing"><label><input type="checkbox" data-tree-checkbox name="perm[]" value="billing"> Billing</label></li>
                        <li data-tree-node="root"><label><input type="checkbox" data-tree-checkbox name="perm[]" value="root" disabled> Root</label></li>
                    </ul>
                </li>
            </ul>
        </div>
    </form>"#;

    fn tree_input(controller: &ReactiveController, value: &str) -> usize {
        controller.tree("perm").unwrap().input_for(value).unwrap()
    }

    #[test]
    fn test_tree_toggle_through_controller() {
        let config = instant("perm").with_tree("perm", CascadeMode::Cascade);
        let mut controller = mock_controller(TREE_FORM, config);

        let users = tree_input(&controller, "users");
        controller.set_checked(users, true).unwrap();
        let admin = tree_input(&controller, "admin");
        assert!(controller.document().indeterminate(admin));
        assert_eq!(controller.document().attr(admin, "aria-checked"), Some("mixed"));

        let billing = tree_input(&controller, "billing");
        controller.set_checked(billing, true).unwrap();
        assert!(controller.document().checked(admin));
        assert!(!controller.document().indeterminate(admin));
        assert_eq!(
            controller.tree_checked_values("perm").unwrap(),
            vec!["admin", "users", "billing"]
        );

        let events = controller.take_events();
        let change = events.iter().rev().find(|e| e.name == "checkbox-tree:change").unwrap();
        assert_eq!(change.detail["treeId"], "perm");
    }

    #[test]
    fn test_disabled_tree_node_toggle_rejected() {
        let config = instant("perm").with_tree("perm", CascadeMode::Cascade);
        let mut controller = mock_controller(TREE_FORM, config);
        let root = tree_input(&controller, "root");

        let err = controller.set_checked(root, true).unwrap_err();
        assert!(matches!(err, DependencyError::DisabledTreeNode { .. }));
        assert!(!controller.document().checked(root));

        let admin = tree_input(&controller, "admin");
        controller.set_checked(admin, true).unwrap();
        assert!(!controller.document().checked(root));
    }

    #[test]
    fn test_independent_tree_does_not_cascade() {
        let config = instant("perm").with_tree("perm", CascadeMode::Independent);
        let mut controller = mock_controller(TREE_FORM, config);
        let admin = tree_input(&controller, "admin");
        controller.set_checked(admin, true).unwrap();
        assert_eq!(controller.tree_checked_values("perm").unwrap(), vec!["admin"]);
    }

    #[test]
    fn test_set_tree_checked_values() {
        let config = instant("perm").with_tree("perm", CascadeMode::Cascade);
        let mut controller = mock_controller(TREE_FORM, config);
        assert!(controller.set_tree_checked_values("perm", &["users".to_string()]));
        let admin = tree_input(&controller, "admin");
        assert!(controller.document().indeterminate(admin));
        assert!(!controller.set_tree_checked_values("missing", &[]));
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // LISTENERS
    // ═══════════════════════════════════════════════════════════════════════════════

    const REQUIRED_FORM: &str = r#"<form id="ship">
        <input type="checkbox" name="gift" data-dependency="true" data-dependency-group="gift" data-dependency-field="gift" checked>
        <div data-dependend="gift" data-dependend-group="gift" data-dependend-field="message">
            <input type="text" name="message" required>
        </div>
    </form>"#;

    #[test]
    fn test_required_toggler_on_document() {
        let mut controller = mock_controller(REQUIRED_FORM, instant("ship"));
        controller.subscribe(0, Box::new(RequiredToggler::new()));
        let gift = controller.control("gift").unwrap();
        let message = controller.control("message").unwrap();
        assert_eq!(controller.is_visible("message"), Some(true));

        controller.set_checked(gift, false).unwrap();
        assert!(!controller.document().has_attr(message, "required"));
        assert!(controller.document().has_attr(message, REQUIRED_SUSPENDED_ATTR));

        controller.set_checked(gift, true).unwrap();
        assert!(controller.document().has_attr(message, "required"));
        assert!(!controller.document().has_attr(message, REQUIRED_SUSPENDED_ATTR));
    }

    struct Count(std::rc::Rc<std::cell::Cell<usize>>);

    impl Listener<FieldEvent, Document> for Count {
        fn handle(&mut self, _event: &FieldEvent, _document: &mut Document) -> Propagation {
            self.0.set(self.0.get() + 1);
            Propagation::Continue
        }
    }

    #[test]
    fn test_unsubscribed_listener_not_called() {
        let mut controller = mock_controller(REQUIRED_FORM, instant("ship"));
        let calls = std::rc::Rc::new(std::cell::Cell::new(0));
        let id = controller.subscribe(0, Box::new(Count(calls.clone())));
        let gift = controller.control("gift").unwrap();

        controller.set_checked(gift, false).unwrap();
        let after_hide = calls.get();
        assert!(after_hide > 0);

        assert!(controller.unsubscribe(id));
        controller.set_checked(gift, true).unwrap();
        assert_eq!(calls.get(), after_hide);
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // ANIMATION
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_slide_hide_collapses_then_finalizes() {
        let animation = AnimationConfig {
            kind: AnimationKind::Slide,
            duration_ms: 200,
            ..AnimationConfig::default()
        };
        let mut controller =
            mock_controller(REQUIRED_FORM, ControllerConfig::new("ship").with_animation(animation));
        let gift = controller.control("gift").unwrap();
        let message = controller.control("message").unwrap();
        let wrapper = controller.wrapper("message").unwrap();

        controller.set_checked(gift, false).unwrap();
        assert!(controller.has_pending_transitions());
        assert!(!controller.document().disabled(message));
        assert_eq!(controller.document().style(wrapper, "overflow"), Some("hidden"));

        controller.tick(199);
        assert!(!controller.document().is_hidden(wrapper));
        controller.tick(1);
        assert!(controller.document().is_hidden(wrapper));
        assert!(controller.document().disabled(message));
        assert!(!controller.has_pending_transitions());
    }
}
