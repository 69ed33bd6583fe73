//! Command signatures and `ExecuteIndirect` translation (§4.6, §4.10).
//!
//! A command signature describes the byte layout of one indirect argument
//! record. At `ExecuteIndirect` time the list picks one of three strategies
//! depending on what the signature contains (§4.6 "ExecuteIndirect"):
//! 1. Pure draw/dispatch arguments translate directly to
//!    `vkCmdDrawIndirectCount` / `vkCmdDrawIndexedIndirectCount` /
//!    `vkCmdDispatchIndirect` / `vkCmdDrawMeshTasksIndirectCountEXT`.
//! 2. A signature that also writes root constants, root descriptors, or
//!    vertex/index buffer bindings needs `VK_EXT_device_generated_commands`.
//! 3. Without that extension, a preprocessing compute shader rewrites the
//!    argument buffer into a plain indirect-draw buffer first.

use ash::vk;

/// One argument in a command signature, in the order D3D12 requires them to
/// appear (any number of root-parameter updates, then exactly one final
/// draw/dispatch/dispatch-mesh argument).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum IndirectArgument {
    Draw,
    DrawIndexed,
    Dispatch,
    DispatchMesh,
    DispatchRays,
    VertexBufferView {
        slot: u32,
    },
    IndexBufferView,
    Constant {
        root_index: u32,
        dest_offset_in_32bit_values: u32,
        num_32bit_values_to_set: u32,
    },
    ConstantBufferView {
        root_index: u32,
    },
    ShaderResourceView {
        root_index: u32,
    },
    UnorderedAccessView {
        root_index: u32,
    },
}

impl IndirectArgument {
    fn is_terminal_action(self) -> bool {
        matches!(
            self,
            IndirectArgument::Draw
                | IndirectArgument::DrawIndexed
                | IndirectArgument::Dispatch
                | IndirectArgument::DispatchMesh
                | IndirectArgument::DispatchRays
        )
    }
}

/// A parsed `D3D12_COMMAND_SIGNATURE_DESC` (§4.10).
#[derive(Debug, Clone)]
pub struct CommandSignature {
    pub arguments: Vec<IndirectArgument>,
    pub byte_stride: u32,
}

/// Which of the three `ExecuteIndirect` paths a signature requires (§4.6).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum IndirectStrategy {
    /// Only `DRAW* `/ `DISPATCH` / `DISPATCH_MESH`: a direct
    /// `vkCmdDraw*IndirectCount` / `vkCmdDispatchIndirect` /
    /// `vkCmdDrawMeshTasksIndirectCountEXT` call.
    DirectTranslation,
    /// Root-parameter or IB/VB writes present and
    /// `VK_EXT_device_generated_commands` available.
    GeneratedCommandsLayout,
    /// Root-parameter or IB/VB writes present but DGC unavailable: rewrite
    /// the argument buffer with a preprocessing compute shader first.
    PreprocessCompute,
}

impl CommandSignature {
    pub fn new(arguments: Vec<IndirectArgument>, byte_stride: u32) -> Self {
        Self {
            arguments,
            byte_stride,
        }
    }

    /// Whether this signature only describes a draw/dispatch argument with
    /// no preceding root-parameter or IB/VB writes (§4.6 strategy 1).
    fn is_pure_action(&self) -> bool {
        self.arguments.len() == 1 && self.arguments[0].is_terminal_action()
    }

    /// Chooses the translation strategy for this signature given whether
    /// `VK_EXT_device_generated_commands` is available on the device (§4.6,
    /// §4.10).
    pub fn strategy(&self, dgc_available: bool) -> IndirectStrategy {
        if self.is_pure_action() {
            IndirectStrategy::DirectTranslation
        } else if dgc_available {
            IndirectStrategy::GeneratedCommandsLayout
        } else {
            IndirectStrategy::PreprocessCompute
        }
    }

    pub fn terminal_action(&self) -> Option<IndirectArgument> {
        self.arguments.last().copied().filter(|a| a.is_terminal_action())
    }
}

/// Emits the direct-translation strategy for a pure draw/dispatch signature
/// (§4.6 strategy 1). `max_count` and `count_buffer` mirror
/// `ExecuteIndirect`'s `MaxCommandCount` and optional `pCountBuffer`.
pub fn record_direct_translation(
    device: &ash::Device,
    cmd: vk::CommandBuffer,
    signature: &CommandSignature,
    argument_buffer: vk::Buffer,
    argument_buffer_offset: vk::DeviceSize,
    count_buffer: Option<(vk::Buffer, vk::DeviceSize)>,
    max_count: u32,
) {
    let Some(action) = signature.terminal_action() else {
        return;
    };
    let (count_buffer, count_offset) = count_buffer.unwrap_or((vk::Buffer::null(), 0));
    unsafe {
        match action {
            IndirectArgument::Draw => {
                device.cmd_draw_indirect_count(
                    cmd,
                    argument_buffer,
                    argument_buffer_offset,
                    count_buffer,
                    count_offset,
                    max_count,
                    signature.byte_stride,
                );
            }
            IndirectArgument::DrawIndexed => {
                device.cmd_draw_indexed_indirect_count(
                    cmd,
                    argument_buffer,
                    argument_buffer_offset,
                    count_buffer,
                    count_offset,
                    max_count,
                    signature.byte_stride,
                );
            }
            IndirectArgument::Dispatch => {
                device.cmd_dispatch_indirect(cmd, argument_buffer, argument_buffer_offset);
            }
            IndirectArgument::DispatchMesh | IndirectArgument::DispatchRays => {
                log::warn!("{action:?} indirect dispatch requires mesh-shader/ray-tracing extension support not wired up here");
            }
            _ => unreachable!("terminal_action() only returns action variants"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pure_draw_signature_chooses_direct_translation() {
        let sig = CommandSignature::new(vec![IndirectArgument::DrawIndexed], 20);
        assert_eq!(sig.strategy(false), IndirectStrategy::DirectTranslation);
        assert_eq!(sig.strategy(true), IndirectStrategy::DirectTranslation);
    }

    #[test]
    fn root_constant_plus_draw_needs_dgc_or_preprocessing() {
        let sig = CommandSignature::new(
            vec![
                IndirectArgument::Constant {
                    root_index: 0,
                    dest_offset_in_32bit_values: 0,
                    num_32bit_values_to_set: 1,
                },
                IndirectArgument::Draw,
            ],
            24,
        );
        assert_eq!(sig.strategy(true), IndirectStrategy::GeneratedCommandsLayout);
        assert_eq!(sig.strategy(false), IndirectStrategy::PreprocessCompute);
    }

    #[test]
    fn terminal_action_is_the_final_draw_or_dispatch_argument() {
        let sig = CommandSignature::new(vec![IndirectArgument::VertexBufferView { slot: 0 }, IndirectArgument::Dispatch], 16);
        assert_eq!(sig.terminal_action(), Some(IndirectArgument::Dispatch));
    }
}
