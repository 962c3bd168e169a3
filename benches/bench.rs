use brunch::Bench;
use rand::rngs::StdRng;
use rand::SeedableRng;

use iqpx::matrix::BitVec;
use iqpx::qrcode::qr_program;
use iqpx::solve::{back_solve, check_key, gen_system};

brunch::benches! {
    {
        let mut rng = StdRng::seed_from_u64(0xBEEFCAFE);
        let a = BitVec::random(4096, &mut rng);
        let b = BitVec::random(4096, &mut rng);
        Bench::new("dot(4096 bits)")
        .run_seeded((a, b), |(a, b)| a.dot_unchecked(&b))
    },
    {
        let mut rng = StdRng::seed_from_u64(0xBEEFCAFE);
        let ch = qr_program(103, 52, &mut rng);
        Bench::new("gen_system(q=103)")
        .run_seeded((ch, rng), |(ch, mut rng)| gen_system(&ch.program, 63, &mut rng))
    },
    {
        let mut rng = StdRng::seed_from_u64(0xBEEFCAFE);
        let ch = qr_program(103, 52, &mut rng);
        let sys = gen_system(&ch.program, 63, &mut rng);
        Bench::new("back_solve(q=103)")
        .run_seeded(sys, |sys| back_solve(&sys))
    },
    {
        let mut rng = StdRng::seed_from_u64(0xBEEFCAFE);
        let ch = qr_program(103, 52, &mut rng);
        Bench::new("check_key(q=103)")
        .run_seeded((ch, rng), |(ch, mut rng)| check_key(&ch.program, &ch.key, &mut rng))
    },
}
