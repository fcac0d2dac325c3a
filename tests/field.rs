use fmsr::field;

#[test]
fn generator_walk_matches_reference_constants() {
    field::init();
    assert_eq!(field::exp_x(0), 1);
    assert_eq!(field::exp_x(1), 2);
    assert_eq!(field::exp_x(8), 0x1D);
    for i in 1..255u16 {
        assert_ne!(field::exp_x(i as u8), field::exp_x(0));
    }
    assert_eq!(field::exp_x(255), field::exp_x(0));
}

#[test]
fn mul_bytes_matches_naive_loop_for_every_scalar() {
    field::init();
    let src: Vec<u8> = (0..=255u16).map(|i| i as u8).collect();
    for b in 0..=255u16 {
        let b = b as u8;
        let mut dst = vec![0u8; src.len()];
        field::mul_bytes(&src, b, &mut dst);
        for (i, &s) in src.iter().enumerate() {
            assert_eq!(dst[i], field::mul(s, b));
        }
    }
}
