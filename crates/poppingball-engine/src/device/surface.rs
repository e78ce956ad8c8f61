use crate::coords::SurfaceSize;
use crate::error::{RenderError, RenderResult};

use super::{SurfaceErrorAction, WgpuTarget};

/// Double-buffered swap surface bound to one window.
///
/// The render-target view is rebuilt from the current back buffer on every
/// acquire, so it always belongs to the buffer being drawn into, including right
/// after a resize.
pub struct PresentationSurface<'w> {
    /// Surface lifetime is tied to the window; the window must outlive it.
    surface: wgpu::Surface<'w>,

    /// Active configuration. Width/height are the last non-zero size.
    config: wgpu::SurfaceConfiguration,

    /// Requested size, possibly zero while the window is minimized.
    size: SurfaceSize,

    present_modes: Vec<wgpu::PresentMode>,
    warned_vsync_clamp: bool,
}

impl<'w> PresentationSurface<'w> {
    pub(crate) fn new(
        surface: wgpu::Surface<'w>,
        caps: &wgpu::SurfaceCapabilities,
        config: wgpu::SurfaceConfiguration,
        size: SurfaceSize,
    ) -> Self {
        Self {
            surface,
            config,
            size,
            present_modes: caps.present_modes.clone(),
            warned_vsync_clamp: false,
        }
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    pub(crate) fn configure(&self, device: &wgpu::Device) {
        if !self.size.is_empty() {
            self.surface.configure(device, &self.config);
        }
    }

    /// Reconfigures the surface after a resize.
    ///
    /// wgpu does not support configuring a surface with a 0x0 size; in that case,
    /// only the requested size is recorded and configuration is deferred.
    pub fn resize(&mut self, device: &wgpu::Device, new_size: SurfaceSize) {
        self.size = new_size;
        if new_size.is_empty() {
            return;
        }

        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(device, &self.config);
    }

    /// Fetches the current back buffer and builds its render-target view.
    ///
    /// `Lost`/`Outdated` surfaces are reconfigured and acquired once more.
    pub fn acquire_render_target(&mut self, device: &wgpu::Device) -> RenderResult<WgpuTarget> {
        if self.size.is_empty() {
            return Err(RenderError::SurfaceUnavailable(
                "surface has zero size".to_string(),
            ));
        }

        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(err) => match SurfaceErrorAction::classify(&err) {
                SurfaceErrorAction::Reconfigured => {
                    log::debug!("surface {err}; reconfiguring");
                    self.surface.configure(device, &self.config);
                    self.surface
                        .get_current_texture()
                        .map_err(|e| RenderError::SurfaceUnavailable(e.to_string()))?
                }
                SurfaceErrorAction::SkipFrame => {
                    return Err(RenderError::SurfaceUnavailable(err.to_string()));
                }
                SurfaceErrorAction::Fatal => return Err(RenderError::DeviceLost(err.to_string())),
            },
        };

        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor {
                label: Some("poppingball back buffer rtv"),
                ..Default::default()
            });

        let size = SurfaceSize::new(
            surface_texture.texture.width(),
            surface_texture.texture.height(),
        );

        Ok(WgpuTarget {
            surface_texture,
            view,
            size,
        })
    }

    /// Switches the present mode to match the requested vsync interval count.
    ///
    /// wgpu paces presentation to at most one vertical sync; larger counts are
    /// treated as one.
    pub(crate) fn apply_vsync(&mut self, device: &wgpu::Device, vsync_intervals: u32) {
        if vsync_intervals > 1 && !self.warned_vsync_clamp {
            log::warn!("present interval {vsync_intervals} unsupported; using 1");
            self.warned_vsync_clamp = true;
        }

        let mode = choose_present_mode(&self.present_modes, vsync_intervals);
        if mode != self.config.present_mode {
            log::debug!("present mode {:?} -> {mode:?}", self.config.present_mode);
            self.config.present_mode = mode;
            self.configure(device);
        }
    }
}

pub(crate) fn choose_surface_format(
    caps: &wgpu::SurfaceCapabilities,
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    let first = caps.formats.first().copied()?;

    if prefer_srgb {
        let preferred = [
            wgpu::TextureFormat::Bgra8UnormSrgb,
            wgpu::TextureFormat::Rgba8UnormSrgb,
        ];
        if let Some(f) = preferred.into_iter().find(|f| caps.formats.contains(f)) {
            return Some(f);
        }
    }

    Some(first)
}

pub(crate) fn choose_alpha_mode(
    caps: &wgpu::SurfaceCapabilities,
    requested: Option<wgpu::CompositeAlphaMode>,
) -> wgpu::CompositeAlphaMode {
    requested
        .filter(|m| caps.alpha_modes.contains(m))
        .or_else(|| caps.alpha_modes.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

/// FIFO is always supported; unsynchronized modes are used only when offered.
pub(crate) fn choose_present_mode(
    supported: &[wgpu::PresentMode],
    vsync_intervals: u32,
) -> wgpu::PresentMode {
    if vsync_intervals > 0 {
        return wgpu::PresentMode::Fifo;
    }

    [wgpu::PresentMode::Immediate, wgpu::PresentMode::Mailbox]
        .into_iter()
        .find(|m| supported.contains(m))
        .unwrap_or(wgpu::PresentMode::Fifo)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(formats: Vec<wgpu::TextureFormat>) -> wgpu::SurfaceCapabilities {
        wgpu::SurfaceCapabilities {
            formats,
            present_modes: vec![wgpu::PresentMode::Fifo],
            alpha_modes: vec![wgpu::CompositeAlphaMode::Opaque],
            ..Default::default()
        }
    }

    #[test]
    fn srgb_format_preferred() {
        let c = caps(vec![
            wgpu::TextureFormat::Bgra8Unorm,
            wgpu::TextureFormat::Bgra8UnormSrgb,
        ]);
        assert_eq!(
            choose_surface_format(&c, true),
            Some(wgpu::TextureFormat::Bgra8UnormSrgb)
        );
        assert_eq!(
            choose_surface_format(&c, false),
            Some(wgpu::TextureFormat::Bgra8Unorm)
        );
    }

    #[test]
    fn no_formats_means_no_surface() {
        assert_eq!(choose_surface_format(&caps(vec![]), true), None);
    }

    #[test]
    fn unsupported_alpha_mode_falls_back() {
        let c = caps(vec![wgpu::TextureFormat::Bgra8Unorm]);
        assert_eq!(
            choose_alpha_mode(&c, Some(wgpu::CompositeAlphaMode::PreMultiplied)),
            wgpu::CompositeAlphaMode::Opaque
        );
    }

    #[test]
    fn vsync_selects_fifo() {
        let all = [
            wgpu::PresentMode::Fifo,
            wgpu::PresentMode::Immediate,
            wgpu::PresentMode::Mailbox,
        ];
        assert_eq!(choose_present_mode(&all, 1), wgpu::PresentMode::Fifo);
        assert_eq!(choose_present_mode(&all, 3), wgpu::PresentMode::Fifo);
        assert_eq!(choose_present_mode(&all, 0), wgpu::PresentMode::Immediate);
        assert_eq!(
            choose_present_mode(&[wgpu::PresentMode::Fifo], 0),
            wgpu::PresentMode::Fifo
        );
    }
}
