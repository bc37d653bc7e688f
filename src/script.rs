//! Generated client-side controller scripts.
//!
//! One inline block per form and per checkbox tree. Each block registers
//! itself under `window.__formDependencies[formId]` or
//! `window.__checkboxTrees[treeId]` and bails out when already registered, so
//! a duplicate block that slips past the render guard is harmless.
//!
//! The form controller mirrors the Rust `ReactiveController`: group
//! evaluation over reachable controllers, depth-first chain cascade, show
//! enables before the transition, hide disables and clears after it, and one
//! cancellable finalize timer per wrapper.

use lazy_static::lazy_static;
use oxc_allocator::Allocator;
use oxc_parser::Parser;
use oxc_span::SourceType;
use regex::Regex;

use crate::controller::ControllerConfig;
use crate::error::{DependencyError, DependencyResult};
use crate::tree::CascadeMode;

lazy_static! {
    static ref NON_ALPHANUMERIC: Regex = Regex::new(r"[^A-Za-z0-9]").unwrap();
}

/// Identifier-safe namespace for a form, tree or picker id.
pub fn namespace(id: &str) -> String {
    NON_ALPHANUMERIC.replace_all(id, "_").to_string()
}

/// JSON that can sit inside an inline `<script>` block.
fn script_json(value: &impl serde::Serialize) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "null".to_string())
        .replace("</", "<\\/")
}

pub fn wrap_script(namespace: &str, body: &str) -> String {
    format!(
        "<script data-controller=\"{}\">\n{}\n</script>",
        namespace, body
    )
}

// ═══════════════════════════════════════════════════════════════════════════════
// FORM CONTROLLER
// ═══════════════════════════════════════════════════════════════════════════════

const FORM_TEMPLATE: &str = r#"(function __NAMESPACE__() {
  var config = __CONFIG__;
  var registry = window.__formDependencies = window.__formDependencies || {};
  if (registry[config.formId]) { return; }
  var form = document.getElementById(config.formId);
  if (!form) { console.warn('[form-cascade] form not found: ' + config.formId); return; }

  var MAX_DEPTH = 64;
  var DISABLED_MARK = 'data-dependency-disabled';
  var anim = config.animation || {};
  var duration = anim.durationMs || 0;
  var kind = anim.enabled === false || !duration ? 'none' : (anim.type || 'fade');
  var easing = anim.easing || 'ease-in-out';
  var timers = new Map();
  var state = new Map();

  function toArray(list) { return Array.prototype.slice.call(list || []); }
  function emit(target, name, detail) {
    target.dispatchEvent(new CustomEvent(name, { bubbles: true, detail: detail }));
  }
  function byAttr(scope, attr, value) {
    return toArray(scope.querySelectorAll('[' + attr + ']')).filter(function (el) {
      return el.getAttribute(attr) === value;
    })[0] || null;
  }
  function split(value) {
    return (value || '').split(/\s+/).filter(function (t) { return t && t !== 'true'; });
  }
  function identifier(field, value) { return value ? field + '-' + value : field; }
  function groupsOf(el) { return split(el.getAttribute('data-dependency-group')); }
  function wrappers(scope) { return toArray(scope.querySelectorAll('[data-dependend-group]')); }
  function controllers(scope) { return toArray(scope.querySelectorAll('[data-dependency="true"]')); }
  function inputs(scope) { return toArray(scope.querySelectorAll('input, select, textarea')); }
  function isVisible(w) { return state.has(w) ? state.get(w) : true; }
  function hiddenBetween(el, stop) {
    for (var node = el.parentElement; node && node !== stop; node = node.parentElement) {
      if (state.has(node) && !state.get(node)) { return true; }
    }
    return false;
  }
  function reachable(el) { return !hiddenBetween(el, null); }

  function collect(el, active) {
    var field = el.getAttribute('data-dependency-field') || el.name;
    var type = (el.type || '').toLowerCase();
    if (el.tagName.toLowerCase() === 'select') {
      var values = toArray(el.options).filter(function (o) { return o.selected && o.value; });
      values.forEach(function (o) { active.push(identifier(field, o.value)); });
      return values.length === 0;
    }
    if (type === 'checkbox' || type === 'radio') {
      if (el.checked) { active.push(identifier(field, el.getAttribute('value') || '')); }
      return false;
    }
    if (type === 'hidden') { active.push(identifier(field, el.value)); return false; }
    if (el.value) { active.push(identifier(field, el.value)); }
    return false;
  }
  function matches(triggers, active) {
    if (!active.length) { return false; }
    if (triggers.indexOf('all') !== -1) { return true; }
    return active.some(function (id) { return triggers.indexOf(id) !== -1; });
  }

  function disable(input) {
    if (!input.disabled) { input.disabled = true; input.setAttribute(DISABLED_MARK, 'true'); }
  }
  function enableInputs(w) {
    inputs(w).forEach(function (input) {
      if (!input.hasAttribute(DISABLED_MARK) || hiddenBetween(input, w)) { return; }
      input.removeAttribute(DISABLED_MARK);
      input.disabled = false;
    });
  }
  function disableAndClear(w) {
    inputs(w).forEach(function (input) {
      disable(input);
      var type = (input.type || '').toLowerCase();
      if (type === 'checkbox' || type === 'radio') { input.checked = false; }
      else if (input.tagName.toLowerCase() === 'select') { input.selectedIndex = -1; }
      else { input.value = ''; }
    });
    (config.trees || []).forEach(function (t) {
      var tree = (window.__checkboxTrees || {})[t.treeId];
      if (tree && w.contains(tree.container)) { tree.setCheckedValues([]); }
    });
  }
  function setStyles(w, styles) {
    Object.keys(styles).forEach(function (k) { w.style[k] = styles[k]; });
  }
  function transition(props) {
    return props.map(function (p) { return p + ' ' + duration + 'ms ' + easing; }).join(', ');
  }
  function animate(w, show, immediate) {
    var pending = timers.get(w);
    if (pending) { clearTimeout(pending); timers.delete(w); }
    var mode = immediate ? 'none' : kind;
    if (show) { enableInputs(w); }
    if (mode === 'none') {
      w.style.display = show ? '' : 'none';
      if (!show) { disableAndClear(w); }
      return;
    }
    var finalize;
    if (mode === 'fade') {
      if (show) {
        setStyles(w, { display: '', opacity: '0', transition: transition(['opacity']) });
        void w.offsetHeight;
        w.style.opacity = '1';
        finalize = function () { setStyles(w, { transition: '', opacity: '' }); };
      } else {
        setStyles(w, { transition: transition(['opacity']), opacity: '0' });
        finalize = function () {
          setStyles(w, { display: 'none', transition: '', opacity: '' });
          disableAndClear(w);
        };
      }
    } else if (show) {
      setStyles(w, { display: '', overflow: 'hidden', height: '0px', opacity: '0', transition: transition(['height', 'opacity']) });
      var target = w.scrollHeight + 'px';
      void w.offsetHeight;
      setStyles(w, { height: target, opacity: '1' });
      finalize = function () { setStyles(w, { height: '', overflow: '', opacity: '', transition: '' }); };
    } else {
      setStyles(w, { overflow: 'hidden', height: w.scrollHeight + 'px', transition: transition(['height', 'opacity']) });
      void w.offsetHeight;
      setStyles(w, { height: '0px', opacity: '0' });
      finalize = function () {
        setStyles(w, { display: 'none', height: '', overflow: '', opacity: '', transition: '' });
        disableAndClear(w);
      };
    }
    timers.set(w, setTimeout(function () { timers.delete(w); finalize(); }, duration));
  }

  function report(w, name) {
    emit(w, 'dependency:' + name, { field: w.getAttribute('data-dependend-field') });
  }
  function groupsWithin(scope, inclusive) {
    var groups = [];
    function add(g) { if (g && groups.indexOf(g) === -1) { groups.push(g); } }
    toArray(scope.querySelectorAll('[data-dependency="true"], [data-dependend-group]')).forEach(function (el) {
      if (el.getAttribute('data-dependency') === 'true') { groupsOf(el).forEach(add); }
      add(el.getAttribute('data-dependend-group'));
    });
    if (inclusive) { add(scope.getAttribute('data-dependend-group')); }
    return groups;
  }
  function evaluateGroup(group, depth, immediate) {
    if (depth > MAX_DEPTH) {
      console.error('[form-cascade] dependency cascade too deep in group ' + group);
      return;
    }
    var active = [];
    var reset = false;
    controllers(form).forEach(function (el) {
      if (groupsOf(el).indexOf(group) === -1 || !reachable(el)) { return; }
      if (collect(el, active)) { reset = true; }
    });
    wrappers(form).forEach(function (w) {
      if (w.getAttribute('data-dependend-group') !== group) { return; }
      var met = !reset && matches(split(w.getAttribute('data-dependend')), active);
      report(w, met ? 'met' : 'not-met');
      var visible = met && reachable(w);
      if (isVisible(w) === visible) { return; }
      state.set(w, visible);
      animate(w, visible, immediate);
      report(w, visible ? 'shown' : 'hidden');
      groupsWithin(w, false).forEach(function (g) { evaluateGroup(g, depth + 1, immediate); });
    });
  }
  function register(scope) {
    var found = wrappers(scope);
    if (scope.hasAttribute('data-dependend-group')) { found.push(scope); }
    found.forEach(function (w) {
      if (state.has(w)) { return; }
      var hidden = w.style.display === 'none';
      state.set(w, !hidden);
      if (hidden) { inputs(w).forEach(disable); }
    });
  }
  function initialize(scope) {
    register(scope);
    groupsWithin(scope, true).forEach(function (g) { evaluateGroup(g, 0, true); });
  }
  function handle(target) {
    if (!target || !target.getAttribute || target.getAttribute('data-dependency') !== 'true') { return; }
    groupsOf(target).forEach(function (g) { evaluateGroup(g, 0, false); });
  }

  function addRow(name) {
    var container = byAttr(form, 'data-repeater', name);
    var prototype = byAttr(document, 'data-repeater-prototype', name);
    if (!container || !prototype) { console.warn('[form-cascade] repeater not found: ' + name); return null; }
    var index = 0;
    toArray(container.children).forEach(function (row) {
      var i = parseInt(row.getAttribute('data-repeater-row'), 10);
      if (!isNaN(i) && i >= index) { index = i + 1; }
    });
    var holder = document.createElement('div');
    holder.innerHTML = prototype.textContent.split('<\\/').join('</').split('__index__').join(String(index));
    var row = holder.firstElementChild;
    if (!row) { return null; }
    container.appendChild(row);
    initialize(row);
    emit(container, 'repeater:add', { name: name, index: index });
    return row;
  }
  function removeRow(name, index) {
    var container = byAttr(form, 'data-repeater', name);
    if (!container) { return false; }
    var row = byAttr(container, 'data-repeater-row', String(index));
    if (!row) { return false; }
    var groups = groupsWithin(row, false);
    wrappers(row).forEach(function (w) {
      var pending = timers.get(w);
      if (pending) { clearTimeout(pending); }
      timers.delete(w);
      state.delete(w);
    });
    row.parentNode.removeChild(row);
    groups.forEach(function (g) { evaluateGroup(g, 0, false); });
    emit(container, 'repeater:remove', { name: name, index: index });
    return true;
  }
  function checkables() {
    return inputs(form).filter(function (i) { return i.type === 'checkbox' || i.type === 'radio'; });
  }

  form.addEventListener('change', function (event) { handle(event.target); });
  form.addEventListener('input', function (event) {
    var t = event.target;
    if (t && t.tagName && t.tagName.toLowerCase() !== 'select' && t.type !== 'checkbox' && t.type !== 'radio') { handle(t); }
  });
  initialize(form);

  registry[config.formId] = {
    config: config,
    refresh: function () { groupsWithin(form, true).forEach(function (g) { evaluateGroup(g, 0, false); }); },
    isVisible: function (field) {
      var w = byAttr(form, 'data-dependend-field', field);
      return w ? isVisible(w) : null;
    },
    getCheckedValues: function () {
      return checkables().filter(function (i) { return i.checked; }).map(function (i) { return i.value; });
    },
    setCheckedValues: function (values) {
      checkables().forEach(function (i) {
        var next = values.indexOf(i.value) !== -1;
        if (i.checked !== next) {
          i.checked = next;
          i.dispatchEvent(new Event('change', { bubbles: true }));
        }
      });
    },
    addRow: addRow,
    removeRow: removeRow
  };
})();"#;

/// Script body for a form controller; `config` is embedded verbatim.
pub fn form_script_body(config: &ControllerConfig) -> String {
    FORM_TEMPLATE
        .replace("__NAMESPACE__", &format!("formDependencies_{}", namespace(&config.form_id)))
        .replace("__CONFIG__", &script_json(config))
}

// ═══════════════════════════════════════════════════════════════════════════════
// CHECKBOX TREE CONTROLLER
// ═══════════════════════════════════════════════════════════════════════════════

const TREE_TEMPLATE: &str = r#"(function __NAMESPACE__() {
  var treeId = __TREE_ID__;
  var mode = __MODE__;
  var registry = window.__checkboxTrees = window.__checkboxTrees || {};
  if (registry[treeId]) { return; }
  var container = Array.prototype.filter.call(document.querySelectorAll('[data-checkbox-tree]'), function (el) {
    return el.getAttribute('data-checkbox-tree') === treeId;
  })[0];
  if (!container) { console.warn('[form-cascade] checkbox tree not found: ' + treeId); return; }

  function toArray(list) { return Array.prototype.slice.call(list || []); }
  function box(item) { return item.querySelector('[data-tree-checkbox]'); }
  function frozen(input) { return input.disabled && !input.hasAttribute('data-dependency-disabled'); }
  function parentItem(item) {
    var p = item.parentElement ? item.parentElement.closest('[data-tree-node]') : null;
    return p && container.contains(p) ? p : null;
  }
  function childItems(item) {
    var list = toArray(item.children).filter(function (c) { return c.tagName.toLowerCase() === 'ul'; })[0];
    return list ? toArray(list.children).filter(function (c) { return c.hasAttribute('data-tree-node'); }) : [];
  }
  function roots() {
    return toArray(container.querySelectorAll('[data-tree-node]')).filter(function (i) { return !parentItem(i); });
  }
  function setState(input, checked, indeterminate) {
    input.checked = checked;
    input.indeterminate = indeterminate;
    input.setAttribute('aria-checked', indeterminate ? 'mixed' : (checked ? 'true' : 'false'));
  }
  function cascadeDown(item, checked) {
    childItems(item).forEach(function (child) {
      var input = box(child);
      if (!input || frozen(input)) { return; }
      setState(input, checked, false);
      cascadeDown(child, checked);
    });
  }
  function recompute(item) {
    var input = box(item);
    if (!input || frozen(input)) { return; }
    var enabled = childItems(item).map(box).filter(function (c) { return c && !frozen(c); });
    if (!enabled.length) { return; }
    var count = enabled.filter(function (c) { return c.checked; }).length;
    setState(input, count === enabled.length, count > 0 && count < enabled.length);
  }
  function walkUp(item) {
    for (var p = parentItem(item); p; p = parentItem(p)) { recompute(p); }
  }
  function normalize(items) {
    items.forEach(function (item) {
      if (box(item) && frozen(box(item))) { return; }
      normalize(childItems(item));
      recompute(item);
    });
  }
  function cascadeChecked(item) {
    var input = box(item);
    if (input && frozen(input)) { return; }
    if (input && input.checked && childItems(item).length) { cascadeDown(item, true); return; }
    childItems(item).forEach(cascadeChecked);
  }
  function values() {
    return toArray(container.querySelectorAll('[data-tree-checkbox]'))
      .filter(function (i) { return i.checked; })
      .map(function (i) { return i.value; });
  }
  function changed() {
    container.dispatchEvent(new CustomEvent('checkbox-tree:change', {
      bubbles: true,
      detail: { treeId: treeId, values: values() }
    }));
  }

  container.addEventListener('change', function (event) {
    var input = event.target;
    if (!input || !input.hasAttribute || !input.hasAttribute('data-tree-checkbox')) { return; }
    if (input.disabled) { event.preventDefault(); return; }
    setState(input, input.checked, false);
    if (mode === 'cascade') {
      var item = input.closest('[data-tree-node]');
      cascadeDown(item, input.checked);
      walkUp(item);
    }
    changed();
  });
  if (mode === 'cascade') { normalize(roots()); }

  registry[treeId] = {
    container: container,
    mode: mode,
    getCheckedValues: values,
    setCheckedValues: function (list) {
      toArray(container.querySelectorAll('[data-tree-checkbox]')).forEach(function (input) {
        if (!frozen(input)) { setState(input, list.indexOf(input.value) !== -1, false); }
      });
      if (mode === 'cascade') {
        roots().forEach(cascadeChecked);
        normalize(roots());
      }
      changed();
    },
    refresh: function () { if (mode === 'cascade') { normalize(roots()); } }
  };
})();"#;

/// Script body for a checkbox tree; the cascade mode is baked in here.
pub fn tree_script_body(tree_id: &str, mode: CascadeMode) -> String {
    TREE_TEMPLATE
        .replace("__NAMESPACE__", &format!("checkboxTree_{}", namespace(tree_id)))
        .replace("__TREE_ID__", &script_json(&tree_id))
        .replace("__MODE__", &script_json(&mode.as_str()))
}

// ═══════════════════════════════════════════════════════════════════════════════
// VALIDATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Parse `source` with oxc and report every syntax error.
pub fn validate_script(namespace: &str, source: &str) -> DependencyResult<()> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::default()).parse();
    if ret.errors.is_empty() {
        return Ok(());
    }
    Err(DependencyError::ScriptSyntax {
        namespace: namespace.to_string(),
        errors: ret.errors.iter().map(|e| e.to_string()).collect(),
    })
}
