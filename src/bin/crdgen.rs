use kube::CustomResourceExt;

fn main() {
    print!(
        "{}",
        serde_yaml::to_string(&dosbox_operator::crds::Game::crd()).unwrap()
    );
}
