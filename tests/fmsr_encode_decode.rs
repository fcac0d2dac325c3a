use fmsr::fmsr::{decode, encode, nc};
use fmsr::FmsrConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[test]
fn fixed_vector_2_4_full_chunk_set() {
    let data = [0xDEu8, 0xAD, 0xBE, 0xEF];
    let cfg = FmsrConfig {
        workers: 1,
        ..FmsrConfig::default()
    };
    let (code_chunks, matrix, chunk_size) = encode(2, 4, &data, true, None, &cfg).unwrap();
    assert_eq!(
        hex::encode(&matrix),
        "fd7eff7f7efd7fffff7ffd7e7fff7efd75e8d442e87542d4d44275e842d4e875"
    );
    let indices: Vec<u8> = (0..nc(2, 4)).collect();
    let (decoded, _) =
        decode(2, 4, &code_chunks, chunk_size, &indices, Some(&matrix), None, true, &cfg).unwrap();
    assert_eq!(decoded, data);
}

#[test]
fn random_subset_of_chunks_reproduces_original_for_every_file_size() {
    let mut rng = StdRng::seed_from_u64(1);
    for size in [0usize, 1, 3, 4, 5, 4096, 10 * 1024 * 1024] {
        let data: Vec<u8> = (0..size).map(|_| rng.gen()).collect();
        let workers = if size > 1_000_000 { 7 } else { 1 };
        let cfg = FmsrConfig {
            workers,
            ..FmsrConfig::default()
        };
        let (code_chunks, matrix, chunk_size) = encode(10, 12, &data, true, None, &cfg).unwrap();
        let nn = fmsr::fmsr::nn(10, 12) as usize;
        let total = nc(10, 12) as usize;
        let mut all: Vec<u8> = (0..total as u8).collect();
        for i in (1..all.len()).rev() {
            let j = rng.gen_range(0..=i);
            all.swap(i, j);
        }
        let chosen: Vec<u8> = all[..nn].to_vec();
        let mut chunks = vec![0u8; nn * chunk_size];
        for (slot, &idx) in chosen.iter().enumerate() {
            let row = idx as usize;
            chunks[slot * chunk_size..(slot + 1) * chunk_size]
                .copy_from_slice(&code_chunks[row * chunk_size..(row + 1) * chunk_size]);
        }
        let (decoded, _) =
            decode(10, 12, &chunks, chunk_size, &chosen, Some(&matrix), None, true, &cfg).unwrap();
        assert_eq!(decoded, data, "mismatch at size={size}");
    }
}

#[test]
fn parallel_workers_match_serial_output_byte_for_byte() {
    let mut rng = StdRng::seed_from_u64(2);
    let data: Vec<u8> = (0..10 * 1024 * 1024).map(|_| rng.gen()).collect();

    let serial_cfg = FmsrConfig {
        workers: 1,
        ..FmsrConfig::default()
    };
    let parallel_cfg = FmsrConfig {
        workers: 7,
        ..FmsrConfig::default()
    };
    let (serial_chunks, matrix, serial_chunk_size) =
        encode(10, 12, &data, true, None, &serial_cfg).unwrap();
    let (parallel_chunks, _, parallel_chunk_size) =
        encode(10, 12, &data, false, Some(matrix), &parallel_cfg).unwrap();

    assert_eq!(serial_chunk_size, parallel_chunk_size);
    assert_eq!(serial_chunks, parallel_chunks);
}
