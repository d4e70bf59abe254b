#![no_main]
use libfuzzer_sys::fuzz_target;
use rdrop_test::receiver::{DefaultHandler, Mock};

fuzz_target!(|data: &[u8]| {
    let mut written_data = Vec::new();
    let (read, write) = tokio::io::split(Mock::new(data.to_vec(), &mut written_data));

    let stream =
        rdrop_protocol::Receiver::from_parts(read, write, DefaultHandler, 1024).into_stream();

    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(async move {
            let mut stream = Box::pin(stream);
            while let Some(Ok(())) = tokio_stream::StreamExt::next(&mut stream).await {}
        });
});
