fn main() {
    println!("hello from relkit");
}
