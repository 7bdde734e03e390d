#[cfg(feature = "integration-tests")]
mod common;

#[test]
#[cfg(feature = "integration-tests")]
fn should_render_clear_colour() {
    use mini_api::{context::Context, flow::ImageTestResult};
    use wgpu::Color;

    use crate::common::test_utils::{FrameCounter, TestRender};

    crate::golden_image_test!(TestRender {
        setup: Box::new(|ctx: &mut Context| {
            ctx.clear_colour = Color::WHITE;
            ctx.camera.controller.enabled = false;
        }),
        validate: Box::new(|_: &Context,
                            state: &mut FrameCounter,
                            texture: &mut image::ImageBuffer<image::Rgba<u8>, wgpu::BufferView>| {
            if state.frame() == 0 {
                return Ok(ImageTestResult::Waiting);
            }
            let desired_pixel = image::Rgba([255, 255, 255, 255]);
            for pixel in texture.pixels() {
                assert_eq!(*pixel, desired_pixel);
            }
            Ok(ImageTestResult::Passed)
        }),
    });
}
