use std::path::Path;

use naga::valid::{Capabilities, ValidationFlags, Validator};

use crate::device::GraphicsBackend;
use crate::error::{RenderError, RenderResult};

use super::vertex::{CONSTANTS_SIZE, Vertex};

const BUILTIN_SHAPE_SHADER: &str = include_str!("shaders/shape.wgsl");

// ── sources ───────────────────────────────────────────────────────────────

/// WGSL source text plus a label used in diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    pub label: String,
    pub code: String,
}

impl ShaderSource {
    pub fn inline(label: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            code: code.into(),
        }
    }

    /// Loads shader text from disk. A missing or unreadable file is reported as a
    /// compile failure of that shader.
    pub fn from_path(path: impl AsRef<Path>) -> RenderResult<Self> {
        let path = path.as_ref();
        let label = path.display().to_string();
        let code = std::fs::read_to_string(path)
            .map_err(|e| RenderError::shader(label.clone(), format!("cannot read source: {e}")))?;
        Ok(Self { label, code })
    }

    /// The solid shape shader bundled with the engine.
    pub fn builtin() -> Self {
        Self::inline("builtin shape.wgsl", BUILTIN_SHAPE_SHADER)
    }
}

/// Entry point names for both stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoints {
    pub vertex: String,
    pub fragment: String,
}

impl Default for EntryPoints {
    fn default() -> Self {
        Self {
            vertex: "vs_main".to_string(),
            fragment: "fs_main".to_string(),
        }
    }
}

/// Inputs to `ShaderProgram::load`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderDesc {
    pub vertex: ShaderSource,
    pub fragment: ShaderSource,
    pub entry_points: EntryPoints,
}

impl ShaderDesc {
    /// Both stages from one source with the default `vs_main`/`fs_main` entry points.
    pub fn single(source: ShaderSource) -> Self {
        Self {
            vertex: source.clone(),
            fragment: source,
            entry_points: EntryPoints::default(),
        }
    }

    pub fn builtin() -> Self {
        Self::single(ShaderSource::builtin())
    }
}

// ── compiled form ─────────────────────────────────────────────────────────

/// A vertex input reflected from the vertex entry point.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct VertexInput {
    pub location: u32,
    pub format: wgpu::VertexFormat,
}

/// Validated source of one stage.
#[derive(Debug, Clone)]
pub struct CompiledStage {
    pub label: String,
    pub code: String,
    pub entry_point: String,
}

/// Both stages parsed, validated and checked against the vertex layout.
///
/// Backends only receive shaders in this form, so module creation on the
/// device never sees invalid code.
#[derive(Debug, Clone)]
pub struct CompiledShader {
    pub vertex: CompiledStage,
    pub fragment: CompiledStage,
    /// Vertex inputs sorted by location; each is provided by [`Vertex::ATTRS`].
    pub inputs: Vec<VertexInput>,
    /// Whether the vertex entry point reads the constants block at
    /// `@group(0) @binding(0)`. The fragment stage never may.
    pub uses_constants: bool,
}

impl CompiledShader {
    pub fn compile(desc: &ShaderDesc) -> RenderResult<Self> {
        let vertex = parse_and_validate(&desc.vertex)?;
        let separate_fragment = if desc.fragment == desc.vertex {
            None
        } else {
            Some(parse_and_validate(&desc.fragment)?)
        };
        let fragment = separate_fragment.as_ref().unwrap_or(&vertex);

        let vertex_ep = find_entry_point(
            &vertex.module,
            &desc.vertex.label,
            &desc.entry_points.vertex,
            naga::ShaderStage::Vertex,
        )?;
        let fragment_ep = find_entry_point(
            &fragment.module,
            &desc.fragment.label,
            &desc.entry_points.fragment,
            naga::ShaderStage::Fragment,
        )?;

        let mut inputs = reflect_vertex_inputs(&vertex.module, vertex_ep.1)
            .map_err(|msg| RenderError::shader(desc.vertex.label.clone(), msg))?;
        inputs.sort_by_key(|i| i.location);
        check_input_layout(&inputs)
            .map_err(|msg| RenderError::shader(desc.vertex.label.clone(), msg))?;

        check_resources(&vertex.module)
            .map_err(|msg| RenderError::shader(desc.vertex.label.clone(), msg))?;
        check_resources(&fragment.module)
            .map_err(|msg| RenderError::shader(desc.fragment.label.clone(), msg))?;

        if let Some(name) = fragment.bound_global_used_by(fragment_ep.0) {
            return Err(RenderError::shader(
                desc.fragment.label.clone(),
                format!(
                    "fragment entry point '{}' reads '{name}'; the constants block is \
                     visible to the vertex stage only",
                    desc.entry_points.fragment
                ),
            ));
        }
        let uses_constants = vertex.bound_global_used_by(vertex_ep.0).is_some();

        Ok(Self {
            vertex: CompiledStage {
                label: desc.vertex.label.clone(),
                code: desc.vertex.code.clone(),
                entry_point: desc.entry_points.vertex.clone(),
            },
            fragment: CompiledStage {
                label: desc.fragment.label.clone(),
                code: desc.fragment.code.clone(),
                entry_point: desc.entry_points.fragment.clone(),
            },
            inputs,
            uses_constants,
        })
    }
}

/// A parsed module and the validator's per-function analysis.
struct ValidModule {
    module: naga::Module,
    info: naga::valid::ModuleInfo,
}

impl ValidModule {
    /// First resource-bound global the entry point at `index` touches, directly
    /// or through called functions.
    fn bound_global_used_by(&self, index: usize) -> Option<&str> {
        let ep_info = self.info.get_entry_point(index);
        self.module
            .global_variables
            .iter()
            .filter(|(_, var)| var.binding.is_some())
            .find(|(handle, _)| !ep_info[*handle].is_empty())
            .map(|(_, var)| var.name.as_deref().unwrap_or("<unnamed>"))
    }
}

fn parse_and_validate(source: &ShaderSource) -> RenderResult<ValidModule> {
    let module = naga::front::wgsl::parse_str(&source.code)
        .map_err(|e| RenderError::shader(source.label.clone(), e.emit_to_string(&source.code)))?;

    let info = Validator::new(ValidationFlags::all(), Capabilities::empty())
        .validate(&module)
        .map_err(|e| RenderError::shader(source.label.clone(), e.emit_to_string(&source.code)))?;

    Ok(ValidModule { module, info })
}

fn find_entry_point<'m>(
    module: &'m naga::Module,
    label: &str,
    name: &str,
    stage: naga::ShaderStage,
) -> RenderResult<(usize, &'m naga::EntryPoint)> {
    let (index, ep) = module
        .entry_points
        .iter()
        .enumerate()
        .find(|(_, ep)| ep.name == name)
        .ok_or_else(|| RenderError::shader(label, format!("entry point '{name}' not found")))?;

    if ep.stage != stage {
        return Err(RenderError::shader(
            label,
            format!("entry point '{name}' is a {:?} stage, expected {stage:?}", ep.stage),
        ));
    }
    Ok((index, ep))
}

/// Collects `@location` inputs of the entry point, flattening input structs.
fn reflect_vertex_inputs(
    module: &naga::Module,
    ep: &naga::EntryPoint,
) -> Result<Vec<VertexInput>, String> {
    let mut inputs = Vec::new();

    for arg in &ep.function.arguments {
        match &arg.binding {
            Some(naga::Binding::Location { location, .. }) => {
                inputs.push(reflect_input(module, *location, arg.ty)?);
            }
            Some(naga::Binding::BuiltIn(_)) => {}
            None => {
                let naga::TypeInner::Struct { members, .. } = &module.types[arg.ty].inner else {
                    continue;
                };
                for member in members {
                    if let Some(naga::Binding::Location { location, .. }) = &member.binding {
                        inputs.push(reflect_input(module, *location, member.ty)?);
                    }
                }
            }
        }
    }

    Ok(inputs)
}

fn reflect_input(
    module: &naga::Module,
    location: u32,
    ty: naga::Handle<naga::Type>,
) -> Result<VertexInput, String> {
    let format = vertex_format(&module.types[ty].inner).ok_or_else(|| {
        format!("vertex input @location({location}) has a type the vertex layout cannot feed")
    })?;
    Ok(VertexInput { location, format })
}

fn vertex_format(inner: &naga::TypeInner) -> Option<wgpu::VertexFormat> {
    match inner {
        naga::TypeInner::Scalar(s) if *s == naga::Scalar::F32 => Some(wgpu::VertexFormat::Float32),
        naga::TypeInner::Vector { size, scalar } if *scalar == naga::Scalar::F32 => Some(match size {
            naga::VectorSize::Bi => wgpu::VertexFormat::Float32x2,
            naga::VectorSize::Tri => wgpu::VertexFormat::Float32x3,
            naga::VectorSize::Quad => wgpu::VertexFormat::Float32x4,
        }),
        _ => None,
    }
}

/// Every reflected input must be provided by the vertex layout with the same format.
fn check_input_layout(inputs: &[VertexInput]) -> Result<(), String> {
    for input in inputs {
        let attr = Vertex::ATTRS
            .iter()
            .find(|a| a.shader_location == input.location)
            .ok_or_else(|| {
                format!(
                    "vertex input @location({}) is not provided by the vertex layout",
                    input.location
                )
            })?;

        if attr.format != input.format {
            return Err(format!(
                "vertex input @location({}) expects {:?} but the layout provides {:?}",
                input.location, input.format, attr.format
            ));
        }
    }
    Ok(())
}

/// Only the constants block at `@group(0) @binding(0)` is bindable.
fn check_resources(module: &naga::Module) -> Result<(), String> {
    for (_, var) in module.global_variables.iter() {
        let Some(binding) = &var.binding else { continue };
        let name = var.name.as_deref().unwrap_or("<unnamed>");

        if var.space != naga::AddressSpace::Uniform || binding.group != 0 || binding.binding != 0 {
            return Err(format!(
                "resource '{name}' at @group({}) @binding({}) is not supported; \
                 only the constants block at @group(0) @binding(0) can be bound",
                binding.group, binding.binding
            ));
        }

        let size = u64::from(module.types[var.ty].inner.size(module.to_ctx()));
        if size > CONSTANTS_SIZE {
            return Err(format!(
                "uniform '{name}' is {size} bytes; the constants block holds {CONSTANTS_SIZE}"
            ));
        }
    }

    Ok(())
}

// ── program ───────────────────────────────────────────────────────────────

/// Vertex program, fragment program and input layout, created together.
///
/// Never partially valid: a failure in any stage leaves no program behind.
pub struct ShaderProgram<B: GraphicsBackend> {
    program: B::Program,
    label: String,
    inputs: Vec<VertexInput>,
    uses_constants: bool,
}

impl<B: GraphicsBackend> ShaderProgram<B> {
    /// Compiles both stages and derives the input layout from the vertex stage.
    pub fn load(backend: &mut B, desc: &ShaderDesc) -> RenderResult<Self> {
        let compiled = CompiledShader::compile(desc)?;
        let program = backend.create_program(&compiled)?;
        log::info!(
            "shader program '{}' loaded ({} vertex inputs)",
            compiled.vertex.label,
            compiled.inputs.len()
        );
        Ok(Self {
            program,
            label: compiled.vertex.label,
            inputs: compiled.inputs,
            uses_constants: compiled.uses_constants,
        })
    }

    pub fn raw(&self) -> &B::Program {
        &self.program
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn inputs(&self) -> &[VertexInput] {
        &self.inputs
    }

    pub fn uses_constants(&self) -> bool {
        self.uses_constants
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(code: &str) -> RenderResult<CompiledShader> {
        CompiledShader::compile(&ShaderDesc::single(ShaderSource::inline("test.wgsl", code)))
    }

    fn diagnostic(err: RenderError) -> String {
        match err {
            RenderError::ShaderCompile { diagnostic, .. } => diagnostic,
            other => panic!("expected shader compile error, got {other:?}"),
        }
    }

    // ── builtin ───────────────────────────────────────────────────────────

    #[test]
    fn builtin_shader_compiles() {
        let compiled = CompiledShader::compile(&ShaderDesc::builtin()).unwrap();
        assert_eq!(
            compiled.inputs,
            vec![
                VertexInput { location: 0, format: wgpu::VertexFormat::Float32x3 },
                VertexInput { location: 1, format: wgpu::VertexFormat::Float32x4 },
            ]
        );
        assert!(compiled.uses_constants);
        assert_eq!(compiled.vertex.entry_point, "vs_main");
        assert_eq!(compiled.fragment.entry_point, "fs_main");
    }

    // ── failures ──────────────────────────────────────────────────────────

    #[test]
    fn syntax_error_carries_diagnostic() {
        let err = compile("@vertex fn vs_main( -> @builtin(position) vec4<f32> {}").unwrap_err();
        assert!(!diagnostic(err).is_empty());
    }

    #[test]
    fn missing_entry_point() {
        let code = BUILTIN_SHAPE_SHADER.replace("fn fs_main", "fn fs_other");
        let msg = diagnostic(compile(&code).unwrap_err());
        assert!(msg.contains("fs_main"), "{msg}");
    }

    #[test]
    fn entry_point_with_wrong_stage() {
        let desc = ShaderDesc {
            entry_points: EntryPoints {
                vertex: "fs_main".to_string(),
                fragment: "fs_main".to_string(),
            },
            ..ShaderDesc::builtin()
        };
        let msg = diagnostic(CompiledShader::compile(&desc).unwrap_err());
        assert!(msg.contains("expected Vertex"), "{msg}");
    }

    #[test]
    fn input_format_mismatch() {
        let code = BUILTIN_SHAPE_SHADER.replace(
            "@location(0) position: vec3<f32>",
            "@location(0) position: vec2<f32>",
        );
        let code = code.replace(
            "input.position * constants.scale_mod",
            "vec3<f32>(input.position, 0.0) * constants.scale_mod",
        );
        let msg = diagnostic(compile(&code).unwrap_err());
        assert!(msg.contains("@location(0)"), "{msg}");
    }

    #[test]
    fn input_not_in_layout() {
        let code = r"
            @vertex
            fn vs_main(@location(0) p: vec3<f32>, @location(5) extra: vec4<f32>) -> @builtin(position) vec4<f32> {
                return vec4<f32>(p, 1.0) + extra;
            }
            @fragment
            fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }
        ";
        let msg = diagnostic(compile(code).unwrap_err());
        assert!(msg.contains("@location(5)"), "{msg}");
    }

    #[test]
    fn oversized_uniform_rejected() {
        let code = r"
            struct Big { a: vec4<f32>, b: vec4<f32>, c: vec4<f32> };
            @group(0) @binding(0) var<uniform> big: Big;
            @vertex
            fn vs_main(@location(0) p: vec3<f32>) -> @builtin(position) vec4<f32> {
                return vec4<f32>(p, 1.0) + big.c;
            }
            @fragment
            fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }
        ";
        let msg = diagnostic(compile(code).unwrap_err());
        assert!(msg.contains("48 bytes"), "{msg}");
    }

    #[test]
    fn fragment_stage_cannot_read_constants() {
        let code = r"
            struct Constants { offset: vec3<f32>, scale_mod: f32, color: vec3<f32> };
            @group(0) @binding(0) var<uniform> c: Constants;
            @vertex
            fn vs_main(@location(0) p: vec3<f32>) -> @builtin(position) vec4<f32> {
                return vec4<f32>(p * c.scale_mod, 1.0);
            }
            @fragment
            fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(c.color, 1.0); }
        ";
        let msg = diagnostic(compile(code).unwrap_err());
        assert!(msg.contains("fs_main") && msg.contains("vertex stage only"), "{msg}");
    }

    #[test]
    fn constants_declared_but_unused_by_vertex_stage() {
        let code = r"
            struct Constants { offset: vec3<f32>, scale_mod: f32, color: vec3<f32> };
            @group(0) @binding(0) var<uniform> c: Constants;
            @vertex
            fn vs_main(@location(0) p: vec3<f32>) -> @builtin(position) vec4<f32> {
                return vec4<f32>(p, 1.0);
            }
            @fragment
            fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }
        ";
        assert!(!compile(code).unwrap().uses_constants);
    }

    // ── partial layouts ───────────────────────────────────────────────────

    #[test]
    fn shader_may_ignore_color_and_constants() {
        let code = r"
            @vertex
            fn vs_main(@location(0) p: vec3<f32>) -> @builtin(position) vec4<f32> {
                return vec4<f32>(p, 1.0);
            }
            @fragment
            fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }
        ";
        let compiled = compile(code).unwrap();
        assert_eq!(compiled.inputs.len(), 1);
        assert!(!compiled.uses_constants);
    }

    #[test]
    fn unreadable_path_is_compile_error() {
        let err = ShaderSource::from_path("/nonexistent/shape.wgsl").unwrap_err();
        assert!(diagnostic(err).contains("cannot read source"));
    }
}
