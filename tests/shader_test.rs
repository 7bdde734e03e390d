#[test]
#[cfg(feature = "integration-tests")]
fn should_return_error_for_broken_wgsl() {
    use mini_api::shader::{self, ShaderError};

    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
    let adapter = futures::executor::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default()))
        .expect("no adapter");
    let (device, _queue) = futures::executor::block_on(adapter.request_device(&wgpu::DeviceDescriptor::default()))
        .expect("no device");

    let result = futures::executor::block_on(shader::compile(&device, "broken", "fn main( {"));
    let err = result.err().expect("broken source compiled");
    let err = err.downcast_ref::<ShaderError>().expect("not a shader error");
    assert_eq!(err.label, "broken");
    assert!(!err.messages.is_empty());

    let module = futures::executor::block_on(shader::compile(&device, "flat", shader::FLAT));
    assert!(module.is_ok());
}
