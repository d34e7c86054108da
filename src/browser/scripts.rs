//! Page scripts behind the [`FormFrame`](crate::frame::FormFrame) primitives.
//!
//! Each body runs inside [`FRAME_WRAPPER`], which resolves the target
//! document and provides `arg`, `doc`, `win`, `need(sel)`, `visible(el)` and
//! `deliver(el)`. Bodies `return` a JSON-serializable value.

/// Wraps a body. `__BODY__` and `__ARG__` are substituted before evaluation.
pub(super) const FRAME_WRAPPER: &str = r#"(() => {
    const arg = __ARG__;
    const reply = (v) => JSON.stringify(v);
    let doc = document;
    if (arg.frame !== null) {
        let host = document.getElementById(arg.frame)
            || document.querySelector('iframe[name=' + JSON.stringify(arg.frame) + ']');
        if (!host) {
            try { host = document.querySelector(arg.frame); } catch (e) { host = null; }
        }
        try {
            doc = host && host.tagName === 'IFRAME' ? host.contentDocument : null;
        } catch (e) {
            doc = null;
        }
        if (!doc) return reply({ status: 'frame_missing' });
    }
    const win = doc.defaultView || window;
    const need = (s) => {
        const el = doc.querySelector(s);
        if (!el) throw { __missing: s };
        return el;
    };
    const visible = (el) => {
        const r = el.getBoundingClientRect();
        const s = win.getComputedStyle(el);
        return r.width > 0 && r.height > 0 && s.display !== 'none'
            && s.visibility !== 'hidden' && parseFloat(s.opacity || '1') > 0;
    };
    const deliver = (el) => {
        if (el.tagName !== 'INPUT' || el.type !== 'file') throw new Error('not a file input');
        const bin = atob(arg.file.data);
        const bytes = new Uint8Array(bin.length);
        for (let i = 0; i < bin.length; i++) bytes[i] = bin.charCodeAt(i);
        const file = new win.File([bytes], arg.file.name, { type: arg.file.mime });
        const dt = new win.DataTransfer();
        dt.items.add(file);
        el.files = dt.files;
        el.dispatchEvent(new win.Event('input', { bubbles: true }));
        el.dispatchEvent(new win.Event('change', { bubbles: true }));
        return el.files.length;
    };
    try {
        const value = (() => { __BODY__ })();
        return reply({ status: 'ok', value: value === undefined ? null : value });
    } catch (e) {
        if (e && e.__missing !== undefined) return reply({ status: 'missing', selector: e.__missing });
        return reply({ status: 'error', message: String((e && e.message) || e) });
    }
})()"#;

pub(super) const PROBE: &str = "return true;";

pub(super) const IS_VISIBLE: &str = r#"
    const el = doc.querySelector(arg.sel);
    return !!el && visible(el);
"#;

pub(super) const SCROLL_INTO_VIEW: &str = r#"
    need(arg.sel).scrollIntoView({ block: 'center', inline: 'nearest' });
    return true;
"#;

pub(super) const COUNT: &str = "return doc.querySelectorAll(arg.sel).length;";

pub(super) const LOCATION: &str = "return String(win.location.href);";

pub(super) const CLICK: &str = r#"
    const el = need(arg.sel);
    el.scrollIntoView({ block: 'center' });
    const r = el.getBoundingClientRect();
    const init = { bubbles: true, cancelable: true, view: win,
        clientX: r.x + r.width / 2, clientY: r.y + r.height / 2 };
    el.dispatchEvent(new win.MouseEvent('mousedown', init));
    el.dispatchEvent(new win.MouseEvent('mouseup', init));
    el.click();
    return true;
"#;

pub(super) const JS_CLICK: &str = "need(arg.sel).click(); return true;";

pub(super) const FOCUS: &str = "need(arg.sel).focus(); return true;";

/// Sets the value through the native setter so framework listeners see it.
pub(super) const FILL: &str = r#"
    const el = need(arg.sel);
    el.focus();
    if (el.isContentEditable) {
        el.textContent = arg.value;
    } else {
        const proto = el.tagName === 'TEXTAREA'
            ? win.HTMLTextAreaElement.prototype
            : win.HTMLInputElement.prototype;
        const setter = Object.getOwnPropertyDescriptor(proto, 'value');
        if (setter && setter.set) setter.set.call(el, arg.value); else el.value = arg.value;
    }
    el.dispatchEvent(new win.Event('input', { bubbles: true }));
    el.dispatchEvent(new win.Event('change', { bubbles: true }));
    return true;
"#;

pub(super) const SET_CHECKED: &str = r#"
    const el = need(arg.sel);
    const state = () => el.getAttribute('role') && !('checked' in el)
        ? el.getAttribute('aria-checked') === 'true'
        : !!el.checked;
    if (state() !== arg.checked) el.click();
    if (state() !== arg.checked && 'checked' in el) {
        el.checked = arg.checked;
        el.dispatchEvent(new win.Event('input', { bubbles: true }));
        el.dispatchEvent(new win.Event('change', { bubbles: true }));
    }
    return state() === arg.checked;
"#;

pub(super) const SELECT_OPTION: &str = r#"
    const el = need(arg.sel);
    if (!el.options) throw new Error('not a select element');
    const want = String(arg.choice).trim().toLowerCase();
    const opt = Array.from(el.options).find(o => arg.by === 'value'
        ? o.value === arg.choice
        : o.text.trim().toLowerCase() === want);
    if (!opt) return false;
    el.value = opt.value;
    opt.selected = true;
    el.dispatchEvent(new win.Event('input', { bubbles: true }));
    el.dispatchEvent(new win.Event('change', { bubbles: true }));
    return true;
"#;

pub(super) const NATIVE_OPTIONS: &str = r#"
    const el = need(arg.sel);
    if (!el.options) return [];
    return Array.from(el.options).map(o => o.text.trim()).filter(t => t);
"#;

pub(super) const INPUT_VALUE: &str = r#"
    const el = need(arg.sel);
    return typeof el.value === 'string' ? el.value : null;
"#;

pub(super) const SELECTED_TEXT: &str = r#"
    const el = need(arg.sel);
    const opt = el.options && el.options[el.selectedIndex];
    return opt ? opt.text.trim() : null;
"#;

pub(super) const TEXT_CONTENT: &str = r#"
    const el = need(arg.sel);
    const t = (el.innerText || el.textContent || '').trim();
    return t || null;
"#;

/// `arg.near` is the trigger selector, or null for the whole document.
pub(super) const OPTION_TEXTS: &str = r#"
    let roots = [doc];
    if (arg.near !== null) {
        roots = [];
        const trigger = doc.querySelector(arg.near);
        if (trigger) {
            for (const attr of ['aria-controls', 'aria-owns']) {
                const id = trigger.getAttribute(attr);
                const owned = id && doc.getElementById(id);
                if (owned) roots.push(owned);
            }
            let node = trigger.parentElement;
            for (let depth = 0; node && depth < 4; depth++, node = node.parentElement) {
                roots.push(node);
            }
        }
    }
    for (const root of roots) {
        const texts = Array.from(root.querySelectorAll(arg.css))
            .filter(visible)
            .map(e => (e.innerText || e.textContent || '').trim().replace(/\s+/g, ' '))
            .filter(t => t);
        if (texts.length) return texts;
    }
    return [];
"#;

/// Tags matches with `data-formwright-ref` and returns selectors for them,
/// tightest text first.
pub(super) const FIND_BY_TEXT: &str = r#"
    const want = arg.text.trim().toLowerCase();
    const hits = [];
    for (const el of doc.querySelectorAll(arg.css)) {
        const t = (el.innerText || el.textContent || '').trim().replace(/\s+/g, ' ').toLowerCase();
        if (!t) continue;
        if (arg.exact ? t === want : t.includes(want)) hits.push([t.length, el]);
    }
    hits.sort((a, b) => a[0] - b[0]);
    let n = Number(win.__formwrightRefs || 0);
    const out = hits.slice(0, 50).map(([, el]) => {
        let ref = el.getAttribute('data-formwright-ref');
        if (!ref) {
            ref = String(++n);
            el.setAttribute('data-formwright-ref', ref);
        }
        return '[data-formwright-ref="' + ref + '"]';
    });
    win.__formwrightRefs = n;
    return out;
"#;

pub(super) const SET_FILES: &str = r#"
    const el = need(arg.sel);
    if (arg.require_visible && !visible(el)) throw new Error('file input is hidden');
    return deliver(el);
"#;

pub(super) const FORCE_VISIBLE: &str = r#"
    const el = need(arg.sel);
    const original = el.getAttribute('style') || '';
    Object.assign(el.style, {
        display: 'block', visibility: 'visible', opacity: '1',
        position: 'fixed', top: '0', left: '0', zIndex: '9999',
    });
    return original;
"#;

pub(super) const RESTORE_STYLE: &str = r#"
    const el = need(arg.sel);
    if (arg.style) el.setAttribute('style', arg.style); else el.removeAttribute('style');
    return true;
"#;

/// Clicks the trigger with file-input activation intercepted, so no native
/// chooser opens, and delivers the file to whichever input it activated.
pub(super) const UPLOAD_VIA_TRIGGER: &str = r#"
    const trigger = need(arg.trigger);
    const proto = win.HTMLInputElement.prototype;
    const origClick = proto.click;
    const origPicker = proto.showPicker;
    let captured = null;
    proto.click = function () {
        if (this.type === 'file') { captured = this; return; }
        return origClick.apply(this, arguments);
    };
    if (origPicker) {
        proto.showPicker = function () {
            if (this.type === 'file') { captured = this; return; }
            return origPicker.apply(this, arguments);
        };
    }
    const onClick = (e) => {
        const t = e.target;
        if (t && t.tagName === 'INPUT' && t.type === 'file') {
            captured = t;
            e.preventDefault();
        }
    };
    doc.addEventListener('click', onClick, true);
    try {
        trigger.click();
    } finally {
        proto.click = origClick;
        if (origPicker) proto.showPicker = origPicker;
        doc.removeEventListener('click', onClick, true);
    }
    if (!captured) return null;
    deliver(captured);
    return captured === doc.querySelector(arg.input) ? 'expected' : 'other';
"#;
