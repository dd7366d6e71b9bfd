//! Host Script Serializer - The Swappable Back End
//!
//! Turns typed instructions into the host application's scripting
//! vocabulary (ExtendScript). All escaping and injection concerns live
//! here and nowhere else: every identifier and raw value passes through
//! the string-literal rules, and paths are normalized to forward slashes
//! before embedding. Each instruction is wrapped in its own guarded
//! block, so one failure aborts neither its siblings in the record nor
//! later records.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::config::VideoConfig;
use crate::instructions::Instruction;

pub const BATCH_SCRIPT_FILE: &str = "layerbatch_run.jsx";
pub const EXTRACT_SCRIPT_FILE: &str = "layerbatch_bounds.jsx";

/// Quote a raw value as a host string literal. Embedded backslashes,
/// quotes, and line breaks are escaped; the result includes the quotes.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Quote a filesystem path, normalizing separators to forward slashes
/// first (the host accepts them on both platforms; backslashes corrupt
/// the literal).
pub fn quote_path(path: &Path) -> String {
    quote(&path.to_string_lossy().replace('\\', "/"))
}

/// Shared slot-lookup helpers, emitted once per script. First match in
/// depth-first order, matching the host's own layer panel order.
fn helper_block() -> &'static str {
    r#"function __findSlot(parent, name) {
    for (var i = 0; i < parent.layers.length; i++) {
        var layer = parent.layers[i];
        if (layer.name == name) { return layer; }
        if (layer.typename == "LayerSet") {
            var found = __findSlot(layer, name);
            if (found) { return found; }
        }
    }
    return null;
}
function __firstTextSlot(parent) {
    for (var i = 0; i < parent.layers.length; i++) {
        var layer = parent.layers[i];
        if (layer.kind == LayerKind.TEXT) { return layer; }
        if (layer.typename == "LayerSet") {
            var found = __firstTextSlot(layer);
            if (found) { return found; }
        }
    }
    return null;
}
function __warn(msg) {
    $.writeln("WARN: " + msg);
}
"#
}

fn write_video_export(out: &mut String, dir: &Path, file_name: &str, video: &VideoConfig) {
    let _ = writeln!(out, "try {{");
    let _ = writeln!(out, "    var renderDesc = new ActionDescriptor();");
    let _ = writeln!(
        out,
        "    renderDesc.putString(stringIDToTypeID(\"directory\"), {});",
        quote_path(dir)
    );
    let _ = writeln!(
        out,
        "    renderDesc.putString(stringIDToTypeID(\"name\"), {});",
        quote(file_name)
    );
    let _ = writeln!(
        out,
        "    renderDesc.putString(stringIDToTypeID(\"format\"), {});",
        quote(video.format.host_name())
    );
    let _ = writeln!(
        out,
        "    renderDesc.putString(stringIDToTypeID(\"preset\"), {});",
        quote(video.preset.host_name())
    );
    // Both explicit dimensions present -> fixed custom size overrides the
    // named preset; otherwise the preset name (or "document") verbatim.
    if let Some((w, h)) = video.explicit_dimensions() {
        let _ = writeln!(
            out,
            "    renderDesc.putString(stringIDToTypeID(\"size\"), \"custom\");"
        );
        let _ = writeln!(
            out,
            "    renderDesc.putInteger(stringIDToTypeID(\"width\"), {});",
            w
        );
        let _ = writeln!(
            out,
            "    renderDesc.putInteger(stringIDToTypeID(\"height\"), {});",
            h
        );
    } else {
        let _ = writeln!(
            out,
            "    renderDesc.putString(stringIDToTypeID(\"size\"), {});",
            quote(video.size.host_name())
        );
    }
    let _ = writeln!(
        out,
        "    renderDesc.putString(stringIDToTypeID(\"aspect\"), {});",
        quote(video.aspect.host_name())
    );
    let _ = writeln!(
        out,
        "    executeAction(stringIDToTypeID(\"exportDocumentToVideo\"), renderDesc, DialogModes.NO);"
    );
    let _ = writeln!(
        out,
        "}} catch (e) {{ __warn(\"video export failed: \" + e); }}"
    );
}

fn write_instruction(out: &mut String, instruction: &Instruction) {
    match instruction {
        Instruction::OpenCopy { template } => {
            // Work on a duplicate; the template file itself stays pristine.
            let _ = writeln!(out, "var __tpl = app.open(new File({}));", quote_path(template));
            let _ = writeln!(out, "var doc = __tpl.duplicate();");
            let _ = writeln!(out, "__tpl.close(SaveOptions.DONOTSAVECHANGES);");
        }
        Instruction::ReplaceImage { slot, asset } => {
            let _ = writeln!(out, "try {{");
            let _ = writeln!(out, "    var layer = __findSlot(doc, {});", quote(slot));
            let _ = writeln!(out, "    if (layer) {{");
            let _ = writeln!(out, "        doc.activeLayer = layer;");
            let _ = writeln!(out, "        var rep = new ActionDescriptor();");
            let _ = writeln!(
                out,
                "        rep.putPath(charIDToTypeID(\"null\"), new File({}));",
                quote(&asset.replace('\\', "/"))
            );
            let _ = writeln!(
                out,
                "        executeAction(stringIDToTypeID(\"placedLayerReplaceContents\"), rep, DialogModes.NO);"
            );
            let _ = writeln!(
                out,
                "        executeAction(stringIDToTypeID(\"placedLayerResetTransforms\"), new ActionDescriptor(), DialogModes.NO);"
            );
            let _ = writeln!(
                out,
                "    }} else {{ __warn(\"slot not found: \" + {}); }}",
                quote(slot)
            );
            let _ = writeln!(
                out,
                "}} catch (e) {{ __warn(\"image replace failed: \" + e); }}"
            );
        }
        Instruction::SetNestedText { slot, text } => {
            let _ = writeln!(out, "try {{");
            let _ = writeln!(out, "    var layer = __findSlot(doc, {});", quote(slot));
            let _ = writeln!(out, "    if (layer) {{");
            let _ = writeln!(out, "        doc.activeLayer = layer;");
            let _ = writeln!(
                out,
                "        executeAction(stringIDToTypeID(\"placedLayerEditContents\"), new ActionDescriptor(), DialogModes.NO);"
            );
            let _ = writeln!(out, "        var inner = app.activeDocument;");
            let _ = writeln!(out, "        var textLayer = __firstTextSlot(inner);");
            let _ = writeln!(out, "        if (textLayer) {{");
            let _ = writeln!(
                out,
                "            textLayer.textItem.contents = {};",
                quote(text)
            );
            let _ = writeln!(
                out,
                "        }} else {{ __warn(\"no text slot inside: \" + {}); }}",
                quote(slot)
            );
            let _ = writeln!(out, "        inner.save();");
            let _ = writeln!(out, "        inner.close(SaveOptions.SAVECHANGES);");
            let _ = writeln!(
                out,
                "    }} else {{ __warn(\"slot not found: \" + {}); }}",
                quote(slot)
            );
            let _ = writeln!(
                out,
                "}} catch (e) {{ __warn(\"nested text failed: \" + e); }}"
            );
        }
        Instruction::SetDirectText { slot, text } => {
            let _ = writeln!(out, "try {{");
            let _ = writeln!(out, "    var layer = __findSlot(doc, {});", quote(slot));
            let _ = writeln!(out, "    if (layer && layer.kind == LayerKind.TEXT) {{");
            let _ = writeln!(out, "        layer.textItem.contents = {};", quote(text));
            let _ = writeln!(
                out,
                "    }} else {{ __warn(\"not a text slot: \" + {}); }}",
                quote(slot)
            );
            let _ = writeln!(
                out,
                "}} catch (e) {{ __warn(\"direct text failed: \" + e); }}"
            );
        }
        Instruction::SaveAs { path } => {
            let _ = writeln!(out, "try {{");
            let _ = writeln!(out, "    var saveFile = new File({});", quote_path(path));
            let _ = writeln!(out, "    saveFile.parent.create();");
            let _ = writeln!(
                out,
                "    doc.saveAs(saveFile, new PhotoshopSaveOptions(), true);"
            );
            let _ = writeln!(out, "}} catch (e) {{ __warn(\"save failed: \" + e); }}");
        }
        Instruction::ExportVideo {
            dir,
            file_name,
            video,
        } => write_video_export(out, dir, file_name, video),
        Instruction::CloseDocument => {
            let _ = writeln!(
                out,
                "try {{ doc.close(SaveOptions.DONOTSAVECHANGES); }} catch (e) {{ __warn(\"close failed: \" + e); }}"
            );
        }
    }
}

/// Assemble the full batch script: document-scope directive, shared
/// helpers once, then each record's sequence in input order.
pub fn assemble_batch(rows: &[Vec<Instruction>]) -> String {
    let mut out = String::new();
    out.push_str("#target photoshop\n");
    out.push_str("app.displayDialogs = DialogModes.NO;\n\n");
    out.push_str(helper_block());
    for (index, row) in rows.iter().enumerate() {
        let _ = writeln!(out, "\n// record {}", index + 1);
        for instruction in row {
            write_instruction(&mut out, instruction);
        }
    }
    out
}

/// The extraction pre-pass script: walk the template's layer tree depth
/// first inside the host, write the geometry and validation reports, and
/// close the template without saving.
pub fn extraction_script(template: &Path, required: &[String], report_dir: &Path) -> String {
    let mut out = String::new();
    out.push_str("#target photoshop\n");
    out.push_str("app.displayDialogs = DialogModes.NO;\n\n");

    let _ = writeln!(out, "var required = [");
    for name in required {
        let _ = writeln!(out, "    {},", quote(name));
    }
    let _ = writeln!(out, "];");

    let geometry_path = report_dir.join(crate::bounds::GEOMETRY_REPORT_FILE);
    let validation_path = report_dir.join(crate::bounds::VALIDATION_REPORT_FILE);

    let _ = writeln!(out, "var doc = app.open(new File({}));", quote_path(template));
    out.push_str(
        r##"var geometryLines = [];
var dumpLines = [];
var visited = {};

function __kindLabel(layer) {
    if (layer.typename == "LayerSet") { return "container"; }
    if (layer.kind == LayerKind.TEXT) { return "text"; }
    if (layer.kind == LayerKind.SMARTOBJECT) { return "image"; }
    return "other";
}

function __walk(parent, depth) {
    for (var i = 0; i < parent.layers.length; i++) {
        var layer = parent.layers[i];
        visited[layer.name] = true;
        dumpLines.push("# depth=" + depth + " kind=" + __kindLabel(layer) + " name=" + layer.name);
        if (layer.kind == LayerKind.SMARTOBJECT && layer.name.toLowerCase().indexOf("image") != -1) {
            var w = layer.bounds[2].as("px") - layer.bounds[0].as("px");
            var h = layer.bounds[3].as("px") - layer.bounds[1].as("px");
            geometryLines.push(layer.name + "=" + Math.round(w) + "," + Math.round(h));
        }
        if (layer.typename == "LayerSet") {
            __walk(layer, depth + 1);
        }
    }
}

__walk(doc, 0);

var missing = [];
for (var r = 0; r < required.length; r++) {
    var name = required[r];
    if (!visited.hasOwnProperty(name)) {
        var dup = false;
        for (var m = 0; m < missing.length; m++) {
            if (missing[m] == name) { dup = true; break; }
        }
        if (!dup) { missing.push(name); }
    }
}

function __writeFile(path, lines) {
    var f = new File(path);
    f.encoding = "UTF-8";
    f.open("w");
    for (var i = 0; i < lines.length; i++) { f.writeln(lines[i]); }
    f.close();
}
"##,
    );
    let _ = writeln!(
        out,
        "__writeFile({}, geometryLines);",
        quote_path(&geometry_path)
    );
    out.push_str(
        r##"var verdict = missing.length == 0 ? "ALL_LAYERS_FOUND" : "MISSING_LAYERS:" + missing.join(",");
var validationLines = [verdict];
for (var d = 0; d < dumpLines.length; d++) { validationLines.push(dumpLines[d]); }
"##,
    );
    let _ = writeln!(
        out,
        "__writeFile({}, validationLines);",
        quote_path(&validation_path)
    );
    out.push_str("doc.close(SaveOptions.DONOTSAVECHANGES);\n");
    out
}

pub fn write_script(path: &Path, content: &str) -> Result<(), std::io::Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)
}
