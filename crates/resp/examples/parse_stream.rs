use resp::RespParseResult;
use resp::RespParser;

fn main() {
	println!("--- RESP Streaming Parse Example ---");

	// A subscribe confirmation followed by a published message, split at
	// arbitrary points the way TCP reads may deliver them.
	let data_chunks = vec![
		b"*3\r\n$9\r\nsubscr".as_slice(),
		b"ibe\r\n$4\r\nnews\r\n:1\r\n*3\r\n$7".as_slice(),
		b"\r\nmessage\r\n$4\r\nne".as_slice(),
		b"ws\r\n$12\r\nhello\r\nworld\r\n".as_slice(),
	];

	let mut parser = RespParser::new();

	for (i, chunk) in data_chunks.iter().enumerate() {
		println!(
			"\n[Stream] Received Chunk {}: {:?}",
			i,
			String::from_utf8_lossy(chunk)
		);

		parser.provide(chunk);

		loop {
			match parser.parse() {
				RespParseResult::Complete(value) => {
					println!("[Parser] Complete {}: {}", value.kind(), value);
				}
				RespParseResult::Incomplete => {
					println!(
						"[Parser] Incomplete, {} bytes buffered",
						parser.buffered_len()
					);
					break;
				}
				RespParseResult::Error(e) => {
					eprintln!("[Parser] Error: {}", e);
					parser.reset();
					break;
				}
			}
		}
	}
}
