use std::borrow::Cow;
use std::collections::HashMap;

use naga_oil::compose::{
    ComposableModuleDescriptor, Composer, ComposerError, NagaModuleDescriptor,
    ShaderDefValue, ShaderLanguage, ShaderType,
};

use crate::gpu::backend::{GpuError, ShaderDefines};

/// Adjustor shader source.
pub const ADJUSTOR_SOURCE: &str =
    include_str!("../../assets/shaders/adjustor.wgsl");
/// Adjustor shader path used in composer diagnostics.
pub const ADJUSTOR_PATH: &str = "adjustor.wgsl";

/// Wraps `naga_oil::compose::Composer` to provide shader composition with
/// `#import` support and preprocessor constants.
///
/// Shared modules are registered at construction time. Consuming shaders use
/// `#import phototune::module_name` to pull in shared code. The composer
/// produces `naga::Module` IR directly, skipping WGSL re-parse at runtime.
pub struct ShaderComposer {
    composer: Composer,
}

/// Shared module definition: source and file path.
struct ModuleDef {
    source: &'static str,
    file_path: &'static str,
}

const MODULES: &[ModuleDef] = &[ModuleDef {
    source: include_str!("../../assets/shaders/modules/color.wgsl"),
    file_path: "modules/color.wgsl",
}];

impl ShaderComposer {
    /// Composer with every shared module registered.
    ///
    /// # Errors
    ///
    /// Returns [`GpuError::ProgramBuild`] if a shared module fails to parse.
    pub fn new() -> Result<Self, GpuError> {
        let mut composer = Composer::default();
        for m in MODULES {
            let _ = composer
                .add_composable_module(ComposableModuleDescriptor {
                    source: m.source,
                    file_path: m.file_path,
                    language: ShaderLanguage::Wgsl,
                    ..Default::default()
                })
                .map_err(|e| {
                    GpuError::ProgramBuild(format!(
                        "failed to register shader module '{}': {e}",
                        m.file_path
                    ))
                })?;
        }
        Ok(Self { composer })
    }

    /// Compose a shader source string into a `wgpu::ShaderModule` ready for
    /// pipeline creation.
    ///
    /// # Errors
    ///
    /// Returns [`GpuError::ProgramBuild`] with the composer diagnostic.
    pub fn compose(
        &mut self,
        device: &wgpu::Device,
        label: &str,
        source: &str,
        file_path: &str,
        defines: &ShaderDefines,
    ) -> Result<wgpu::ShaderModule, GpuError> {
        let naga_module =
            self.compose_naga(source, file_path, defines).map_err(|e| {
                GpuError::ProgramBuild(format!(
                    "failed to compose shader '{file_path}': {e}"
                ))
            })?;
        Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Naga(Cow::Owned(naga_module)),
        }))
    }

    /// Compose a shader source into a `naga::Module` without creating a wgpu
    /// shader module. Useful for testing shader composition without a GPU
    /// device.
    pub fn compose_naga(
        &mut self,
        source: &str,
        file_path: &str,
        defines: &ShaderDefines,
    ) -> Result<naga::Module, Box<ComposerError>> {
        self.composer
            .make_naga_module(NagaModuleDescriptor {
                source,
                file_path,
                shader_type: ShaderType::Wgsl,
                shader_defs: shader_defs(defines),
                ..Default::default()
            })
            .map_err(Box::new)
    }
}

fn shader_defs(defines: &ShaderDefines) -> HashMap<String, ShaderDefValue> {
    defines
        .pairs()
        .iter()
        .map(|&(name, value)| {
            (
                name.to_owned(),
                ShaderDefValue::Int(i32::try_from(value).unwrap_or(i32::MAX)),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defines(max_layers: u32) -> ShaderDefines {
        ShaderDefines {
            max_layers,
            gauss_blur_max_radius: 5,
            checker_tile_width: 8,
        }
    }

    #[test]
    fn adjustor_composes_for_every_capacity() {
        let mut composer = ShaderComposer::new().unwrap();
        for max_layers in [1, 4, 14] {
            let module = composer
                .compose_naga(ADJUSTOR_SOURCE, ADJUSTOR_PATH, &defines(max_layers))
                .unwrap_or_else(|e| {
                    panic!("adjustor failed with MAX_LAYERS={max_layers}: {e}")
                });
            assert!(module
                .entry_points
                .iter()
                .any(|ep| ep.name == "fs_main"));
        }
    }

    #[test]
    fn defines_become_integer_shader_defs() {
        let defs = shader_defs(&defines(6));
        assert_eq!(defs.get("MAX_LAYERS"), Some(&ShaderDefValue::Int(6)));
        assert_eq!(
            defs.get("GAUSS_BLUR_MAX_RADIUS"),
            Some(&ShaderDefValue::Int(5))
        );
        assert_eq!(defs.len(), 3);
    }
}
