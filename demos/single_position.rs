use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use uav_mimo_link::beamforming::{DigitalCombinerProvider, DigitalPrecoderProvider};
use uav_mimo_link::config::LinkConfig;
use uav_mimo_link::io::{BaseStation, BaseStationConfig, Uav, UavConfig};
use uav_mimo_link::physics::channel::ChannelGenerator;
use uav_mimo_link::physics::csi::{effective_csi, full_csi};

fn main() {
    let bs = BaseStation::new(BaseStationConfig::default()).expect("valid BS");
    let uav = Uav::new(UavConfig::default()).expect("valid UAV");
    let link = LinkConfig::default();

    println!("BS at {:?}, UAV at {:?}", bs.location(), uav.location());
    println!("Distance: {:.2} m", bs.location().distance_to(uav.location()));

    let generator = ChannelGenerator::new(link);
    let mut rng = ChaCha8Rng::seed_from_u64(1);

    for trial in 0..5 {
        let channel = generator.generate(&bs.endpoint(), &uav.endpoint(), &mut rng).expect("channel");
        let full = full_csi(channel.h, bs.n_s()).expect("full CSI");
        let eff = effective_csi(&full.channel, bs.analog_precoder(), uav.analog_combiner(), bs.n_s())
            .expect("effective CSI");
        println!(
            "trial {}: |H|_F = {:.3e}, capture full {:.3}, effective {:.3}",
            trial,
            full.channel.norm(),
            full.power_capture_ratio().unwrap_or(f64::NAN),
            eff.power_capture_ratio().unwrap_or(f64::NAN),
        );
    }
}
