//! Runtime binding context shared by both backends.

use std::collections::BTreeMap;

use crate::error::ShaderError;
use crate::limits::{MAX_OUTPUT_TEXTURE_SLOTS, MAX_SAMPLER_SLOTS};
use crate::texture::{Sampler, Texture};
use crate::vec4::Vec4;

pub type OutputTexture = Box<dyn Texture + Send>;

/// Constants, samplers and the output texture a program runs against.
///
/// Constants are sparse: only indices explicitly set are present. Binding happens before a
/// render; during a render the context is only read, apart from texels written to the output.
#[derive(Default)]
pub struct ShaderData {
    constants: BTreeMap<u32, Vec4>,
    samplers: Vec<Option<Sampler>>,
    output: Option<OutputTexture>,
}

fn check_slot(what: &'static str, index: u32, max: u32) -> Result<usize, ShaderError> {
    if index >= max {
        return Err(ShaderError::SlotOutOfRange { what, index, max });
    }
    Ok(index as usize)
}

impl ShaderData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `c{index}`. Scalars are splatted; `(x, y)` pairs become `(x, y, 0, 0)`.
    pub fn set_constant(&mut self, index: u32, value: impl Into<Vec4>) {
        self.constants.insert(index, value.into());
    }

    pub fn constant_or_zero(&self, index: u32) -> Vec4 {
        self.constants.get(&index).copied().unwrap_or(Vec4::ZERO)
    }

    pub fn constant(&self, index: u32) -> Result<Vec4, ShaderError> {
        self.constants
            .get(&index)
            .copied()
            .ok_or(ShaderError::MissingConstant { index })
    }

    pub fn constants(&self) -> &BTreeMap<u32, Vec4> {
        &self.constants
    }

    pub fn set_sampler(&mut self, index: u32, sampler: Sampler) -> Result<(), ShaderError> {
        let slot = check_slot("sampler", index, MAX_SAMPLER_SLOTS)?;
        if self.samplers.len() <= slot {
            self.samplers.resize(slot + 1, None);
        }
        self.samplers[slot] = Some(sampler);
        Ok(())
    }

    pub fn sampler(&self, index: u32) -> Result<&Sampler, ShaderError> {
        self.bindings().sampler(index)
    }

    pub fn set_output_texture(
        &mut self,
        index: u32,
        texture: impl Texture + Send + 'static,
    ) -> Result<(), ShaderError> {
        check_slot("output texture", index, MAX_OUTPUT_TEXTURE_SLOTS)?;
        self.output = Some(Box::new(texture));
        Ok(())
    }

    pub fn output_texture(&self, index: u32) -> Result<&(dyn Texture + Send), ShaderError> {
        check_slot("output texture", index, MAX_OUTPUT_TEXTURE_SLOTS)?;
        self.output
            .as_deref()
            .ok_or(ShaderError::UnboundOutputTexture { index })
    }

    /// Unbinds and returns the output texture, typically after a render.
    pub fn take_output_texture(&mut self, index: u32) -> Result<OutputTexture, ShaderError> {
        check_slot("output texture", index, MAX_OUTPUT_TEXTURE_SLOTS)?;
        self.output
            .take()
            .ok_or(ShaderError::UnboundOutputTexture { index })
    }

    pub(crate) fn bindings(&self) -> Bindings<'_> {
        Bindings {
            constants: &self.constants,
            samplers: &self.samplers,
        }
    }

    /// Read-only bindings alongside the mutable output texture.
    pub(crate) fn split_for_render(
        &mut self,
    ) -> Result<(Bindings<'_>, &mut (dyn Texture + Send)), ShaderError> {
        let output = self
            .output
            .as_deref_mut()
            .ok_or(ShaderError::UnboundOutputTexture { index: 0 })?;
        let bindings = Bindings {
            constants: &self.constants,
            samplers: &self.samplers,
        };
        Ok((bindings, output))
    }
}

#[derive(Clone, Copy)]
pub(crate) struct Bindings<'a> {
    constants: &'a BTreeMap<u32, Vec4>,
    samplers: &'a [Option<Sampler>],
}

impl<'a> Bindings<'a> {
    pub fn constants(&self) -> &'a BTreeMap<u32, Vec4> {
        self.constants
    }

    pub fn constant_or_zero(&self, index: u32) -> Vec4 {
        self.constants.get(&index).copied().unwrap_or(Vec4::ZERO)
    }

    pub fn sampler(&self, index: u32) -> Result<&'a Sampler, ShaderError> {
        check_slot("sampler", index, MAX_SAMPLER_SLOTS)?;
        self.samplers
            .get(index as usize)
            .and_then(Option::as_ref)
            .ok_or(ShaderError::UnboundSampler { index })
    }
}
