use super::BackendError;

/// Picks the swap-chain format for camera output.
///
/// Camera frames are 8-bit RGBA, so an 8-bit format wins over wider ones a
/// surface may list first (10-bit, float HDR). With `srgb` the encoded
/// variant is taken; without it frame bytes reach the screen as stored.
pub(crate) fn choose_surface_format(
    caps: &wgpu::SurfaceCapabilities,
    srgb: bool,
) -> Option<wgpu::TextureFormat> {
    use wgpu::TextureFormat as F;

    let eight_bit: [F; 4] = if srgb {
        [F::Rgba8UnormSrgb, F::Bgra8UnormSrgb, F::Rgba8Unorm, F::Bgra8Unorm]
    } else {
        [F::Rgba8Unorm, F::Bgra8Unorm, F::Rgba8UnormSrgb, F::Bgra8UnormSrgb]
    };

    eight_bit
        .into_iter()
        .find(|f| caps.formats.contains(f))
        .or_else(|| caps.formats.first().copied())
}

/// Camera frames have no meaningful alpha: the output composites opaque
/// unless the host asked for a mode the surface supports.
pub(crate) fn choose_alpha_mode(
    caps: &wgpu::SurfaceCapabilities,
    requested: Option<wgpu::CompositeAlphaMode>,
) -> wgpu::CompositeAlphaMode {
    use wgpu::CompositeAlphaMode as A;

    match requested {
        Some(mode) if caps.alpha_modes.contains(&mode) => mode,
        _ if caps.alpha_modes.contains(&A::Opaque) => A::Opaque,
        _ => caps.alpha_modes.first().copied().unwrap_or(A::Auto),
    }
}

pub(crate) fn choose_present_mode(
    caps: &wgpu::SurfaceCapabilities,
    requested: wgpu::PresentMode,
) -> wgpu::PresentMode {
    if caps.present_modes.contains(&requested) {
        requested
    } else {
        wgpu::PresentMode::Fifo
    }
}

/// Maps a swap-chain acquisition error onto the backend taxonomy.
///
/// An outdated swap chain is reconfigured in place and the frame is skipped.
/// A lost surface is not: its native window is gone, so the binding is retired.
pub(crate) fn map_surface_error(
    surface: &wgpu::Surface<'_>,
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    err: wgpu::SurfaceError,
) -> BackendError {
    match err {
        wgpu::SurfaceError::Outdated => {
            surface.configure(device, config);
            BackendError::Transient("swap chain outdated; reconfigured".into())
        }
        wgpu::SurfaceError::Lost => BackendError::SurfaceLost("swap chain lost".into()),
        wgpu::SurfaceError::OutOfMemory => BackendError::ContextLost("out of memory".into()),
        wgpu::SurfaceError::Timeout => BackendError::Transient("acquire timed out".into()),
        wgpu::SurfaceError::Other => BackendError::Transient("acquire failed".into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(formats: Vec<wgpu::TextureFormat>) -> wgpu::SurfaceCapabilities {
        wgpu::SurfaceCapabilities {
            formats,
            present_modes: vec![wgpu::PresentMode::Fifo, wgpu::PresentMode::Mailbox],
            alpha_modes: vec![wgpu::CompositeAlphaMode::Opaque],
            usages: wgpu::TextureUsages::RENDER_ATTACHMENT,
        }
    }

    #[test]
    fn srgb_format_preferred_when_available() {
        let c = caps(vec![
            wgpu::TextureFormat::Rgba8Unorm,
            wgpu::TextureFormat::Rgba8UnormSrgb,
        ]);
        assert_eq!(
            choose_surface_format(&c, true),
            Some(wgpu::TextureFormat::Rgba8UnormSrgb)
        );
        assert_eq!(
            choose_surface_format(&c, false),
            Some(wgpu::TextureFormat::Rgba8Unorm)
        );
    }

    #[test]
    fn eight_bit_format_beats_wider_first_entry() {
        let c = caps(vec![
            wgpu::TextureFormat::Rgb10a2Unorm,
            wgpu::TextureFormat::Bgra8Unorm,
        ]);
        assert_eq!(
            choose_surface_format(&c, false),
            Some(wgpu::TextureFormat::Bgra8Unorm)
        );
        assert_eq!(
            choose_surface_format(&c, true),
            Some(wgpu::TextureFormat::Bgra8Unorm)
        );
    }

    #[test]
    fn opaque_alpha_unless_requested() {
        let mut c = caps(vec![wgpu::TextureFormat::Bgra8Unorm]);
        c.alpha_modes = vec![
            wgpu::CompositeAlphaMode::PreMultiplied,
            wgpu::CompositeAlphaMode::Opaque,
        ];
        assert_eq!(choose_alpha_mode(&c, None), wgpu::CompositeAlphaMode::Opaque);
        assert_eq!(
            choose_alpha_mode(&c, Some(wgpu::CompositeAlphaMode::PreMultiplied)),
            wgpu::CompositeAlphaMode::PreMultiplied
        );
    }

    #[test]
    fn no_formats_means_no_choice() {
        assert_eq!(choose_surface_format(&caps(vec![]), true), None);
    }

    #[test]
    fn unsupported_requests_fall_back() {
        let c = caps(vec![wgpu::TextureFormat::Rgba8Unorm]);
        assert_eq!(
            choose_alpha_mode(&c, Some(wgpu::CompositeAlphaMode::PreMultiplied)),
            wgpu::CompositeAlphaMode::Opaque
        );
        assert_eq!(
            choose_present_mode(&c, wgpu::PresentMode::Immediate),
            wgpu::PresentMode::Fifo
        );
        assert_eq!(
            choose_present_mode(&c, wgpu::PresentMode::Mailbox),
            wgpu::PresentMode::Mailbox
        );
    }
}
